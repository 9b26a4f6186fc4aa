//! Batch composition binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Parser};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tdl_composer::progress::{self, DEFAULT_PROGRESS_BUFFER};
use tdl_composer::{BatchComposer, Collaborators, ComposerConfig, ExternalDownloader, ProgressReport};
use tdl_media::{check_encoder, resolve_executable, CancelSignal};
use tdl_models::request::{DEFAULT_COMPOSER_ARGS, DEFAULT_RENDER_INPUT_ARGS, DEFAULT_RENDER_OUTPUT_ARGS};
use tdl_models::{ArgumentTemplates, ChatLayout, CompositionRequest, CropWindow, RenderStyle};

#[derive(Parser, Debug)]
#[command(
    name = "tdl-compose",
    about = "Download a Twitch VOD or clip with its chat and burn the rendered chat into the video",
    version,
    disable_help_flag = true
)]
struct Cli {
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,

    /// Read the whole request from a JSON file instead of flags
    #[arg(long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// The ID of the VOD or clip to download
    #[arg(short = 'u', long)]
    id: Option<String>,

    /// The quality the program will attempt to download
    #[arg(short, long)]
    quality: Option<String>,

    /// Path to output file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Time in seconds to crop beginning
    #[arg(short = 'b', long)]
    beginning: Option<f64>,

    /// Time in seconds to crop ending
    #[arg(short = 'e', long)]
    ending: Option<f64>,

    /// Number of download threads
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// OAuth to be passed when downloading a VOD
    #[arg(long)]
    oauth: Option<String>,

    /// Enable timestamps in the chat render
    #[arg(long)]
    timestamp: bool,

    /// Color of background for chat render
    #[arg(long, default_value = "#111111")]
    background_color: String,

    /// Color of messages for chat render
    #[arg(long, default_value = "#ffffff")]
    message_color: String,

    /// Height of chat render
    #[arg(short = 'h', long, default_value_t = 600)]
    chat_height: u32,

    /// Width of chat render
    #[arg(short = 'w', long, default_value_t = 350)]
    chat_width: u32,

    /// Horizontal position of chat on composition
    #[arg(short = 'x', long = "chat-pos-x", default_value_t = 10, allow_negative_numbers = true)]
    chat_pos_x: i32,

    /// Vertical position of chat on composition
    #[arg(short = 'y', long = "chat-pos-y", default_value_t = 10, allow_negative_numbers = true)]
    chat_pos_y: i32,

    /// Transparent PNG drawn above the chat
    #[arg(long)]
    border_image: Option<PathBuf>,

    /// Transparent PNG drawn below the chat
    #[arg(long)]
    background_image: Option<PathBuf>,

    /// Enable BTTV emotes in chat render
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    bttv: bool,

    /// Enable FFZ emotes in chat render
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    ffz: bool,

    /// Enable outline in chat render
    #[arg(long)]
    outline: bool,

    /// Enable sub messages
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    sub_messages: bool,

    /// Size of outline in chat render
    #[arg(long, default_value_t = 4.0)]
    outline_size: f64,

    /// Font to use in chat render
    #[arg(short = 'f', long, default_value = "arial")]
    font: String,

    /// Size of font in chat render
    #[arg(long, default_value_t = 12.0)]
    font_size: f64,

    /// Font style for messages: normal, bold or italic
    #[arg(long = "message-fontstyle", default_value = "normal")]
    message_fontstyle: String,

    /// Font style for usernames: normal, bold or italic
    #[arg(long = "username-fontstyle", default_value = "bold")]
    username_fontstyle: String,

    /// Padding space to left of chat render
    #[arg(long, default_value_t = 2)]
    padding_left: u32,

    /// Framerate of chat render output
    #[arg(long, default_value_t = 30)]
    framerate: u32,

    /// Time in seconds between chat render updates
    #[arg(long, default_value_t = 0.2)]
    update_rate: f64,

    /// Input arguments for the chat render encoder
    #[arg(long, default_value = DEFAULT_RENDER_INPUT_ARGS)]
    input_args: String,

    /// Output arguments for the chat render encoder
    #[arg(long, default_value = DEFAULT_RENDER_OUTPUT_ARGS)]
    output_args: String,

    /// Arguments for the final composition
    #[arg(long, default_value = DEFAULT_COMPOSER_ARGS)]
    composer_args: String,

    /// Path to ffmpeg executable
    #[arg(long)]
    ffmpeg_path: Option<PathBuf>,

    /// Path to the downloader executable
    #[arg(long)]
    downloader_path: Option<PathBuf>,

    /// Path to temporary folder to use for cache
    #[arg(long)]
    temp_path: Option<PathBuf>,

    /// Keep the downloaded and rendered intermediate files
    #[arg(long)]
    keep_intermediates: bool,

    /// Enable debug logging, including encoder output
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    /// Build the request, with flags taking precedence over the environment.
    fn to_request(&self, config: &ComposerConfig) -> anyhow::Result<CompositionRequest> {
        if let Some(path) = &self.request {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read request file {}", path.display()))?;
            return serde_json::from_str(&text)
                .with_context(|| format!("Invalid request file {}", path.display()));
        }

        let id = self.id.clone().context("--id is required")?;
        let output = self.output.clone().context("--output is required")?;
        let encoder = self
            .ffmpeg_path
            .clone()
            .unwrap_or_else(|| config.ffmpeg_path.clone());

        let mut request = CompositionRequest::new(id, output, encoder)
            .with_crop(CropWindow::new(self.beginning, self.ending))
            .with_layout(ChatLayout {
                top: self.chat_pos_y,
                left: self.chat_pos_x,
                border_image: self.border_image.clone(),
                background_image: self.background_image.clone(),
            })
            .with_templates(ArgumentTemplates {
                input_args: self.input_args.clone(),
                output_args: self.output_args.clone(),
                composer_args: self.composer_args.clone(),
            })
            .retain_intermediates(self.keep_intermediates || config.keep_intermediates);

        request.style = RenderStyle {
            background_color: self.background_color.clone(),
            message_color: self.message_color.clone(),
            chat_width: self.chat_width,
            chat_height: self.chat_height,
            font: self.font.clone(),
            font_size: self.font_size,
            message_font_style: self.message_fontstyle.clone(),
            username_font_style: self.username_fontstyle.clone(),
            outline: self.outline,
            outline_size: self.outline_size,
            padding_left: self.padding_left,
            framerate: self.framerate,
            update_rate: self.update_rate,
            bttv_emotes: self.bttv,
            ffz_emotes: self.ffz,
            sub_messages: self.sub_messages,
            timestamp: self.timestamp,
        };
        request.quality = self.quality.clone();
        request.oauth = self.oauth.clone();
        request.download_threads = self.threads.unwrap_or(config.download_threads);
        request.temp_dir = self.temp_path.clone().or_else(|| config.temp_dir.clone());

        Ok(request)
    }
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    // Colored output for terminals, JSON for log collectors
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let level = if verbose { "tdl=debug" } else { "tdl=info" };
    let env_filter = EnvFilter::from_default_env().add_directive(level.parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let config = ComposerConfig::from_env();
    debug!(?config, "Composer config");

    let request = cli.to_request(&config)?;
    let downloader_path = cli
        .downloader_path
        .clone()
        .unwrap_or_else(|| config.downloader_path.clone());

    check_encoder(&request.encoder_path).context("Encoder is not available")?;
    let downloader_path =
        resolve_executable(&downloader_path).context("Downloader is not available")?;

    let (cancel_tx, cancel) = CancelSignal::channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling composition");
            let _ = cancel_tx.send(true);
        }
    });

    let (progress, mut reports) = progress::channel(DEFAULT_PROGRESS_BUFFER);
    let printer = tokio::spawn(async move {
        while let Some(report) = reports.recv().await {
            match report {
                ProgressReport::Message(message) => info!("[STATUS] - {}", message),
                ProgressReport::Percent(percent) => debug!(percent, "Progress"),
                ProgressReport::Log(line) => info!("[LOG] - {}", line),
            }
        }
    });

    let downloader = Arc::new(ExternalDownloader::new(downloader_path));
    let composer = BatchComposer::new(Collaborators::shared(downloader)).with_cancel(cancel);

    let result = composer.compose(&request, &progress).await;
    drop(progress);
    printer.await.ok();

    match result {
        Ok(outcome) => {
            info!(
                output = %outcome.output_path.display(),
                dimension = %outcome.dimension,
                render_secs = outcome.render_time.as_secs(),
                removed = outcome.cleanup.removed.len(),
                "Composition finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(stage = e.stage(), "Composition failed: {}", e);
            Err(e.into())
        }
    }
}
