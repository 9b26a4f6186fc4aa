//! Composition request definitions.
//!
//! Field defaults mirror the command-line defaults of the downloader tool
//! so that a request deserialized from a sparse JSON document renders the
//! same chat as the tool would on its own.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default chat-render encoder input arguments.
pub const DEFAULT_RENDER_INPUT_ARGS: &str = "-framerate {fps} -f rawvideo -analyzeduration {max_int} -probesize {max_int} -pix_fmt bgra -video_size {width}x{height} -i -";
/// Default chat-render encoder output arguments.
pub const DEFAULT_RENDER_OUTPUT_ARGS: &str =
    "-c:v libx264 -preset veryfast -crf 18 -pix_fmt yuv420p \"{save_path}\"";
/// Default composition arguments.
///
/// Driven entirely by the synthesized inputs and filtergraph, so it works
/// with and without the optional border/background images.
pub const DEFAULT_COMPOSER_ARGS: &str = "{input_files}-filter_complex \"{input_mappings}{filtergraph}\" -map \"[output]\" -map 0:a? -c:a copy -c:v libx264 -preset veryfast -crf 18 -pix_fmt yuv420p -y \"{save_path}\"";

/// Default number of parallel segment downloads for VODs.
pub const DEFAULT_DOWNLOAD_THREADS: usize = 10;

/// Time window cropped out of the source, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CropWindow {
    /// Seconds to skip at the start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin: Option<f64>,
    /// Absolute end time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<f64>,
}

impl CropWindow {
    pub fn new(begin: Option<f64>, end: Option<f64>) -> Self {
        Self { begin, end }
    }

    /// Whether any cropping is requested.
    pub fn is_cropped(&self) -> bool {
        self.begin.is_some() || self.end.is_some()
    }
}

/// Styling handed to the chat renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub background_color: String,
    pub message_color: String,
    pub chat_width: u32,
    pub chat_height: u32,
    pub font: String,
    pub font_size: f64,
    /// normal, bold or italic
    pub message_font_style: String,
    /// normal, bold or italic
    pub username_font_style: String,
    pub outline: bool,
    pub outline_size: f64,
    pub padding_left: u32,
    /// Frames per second of the rendered chat
    pub framerate: u32,
    /// Seconds between chat redraws
    pub update_rate: f64,
    pub bttv_emotes: bool,
    pub ffz_emotes: bool,
    pub sub_messages: bool,
    pub timestamp: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background_color: "#111111".to_string(),
            message_color: "#ffffff".to_string(),
            chat_width: 350,
            chat_height: 600,
            font: "arial".to_string(),
            font_size: 12.0,
            message_font_style: "normal".to_string(),
            username_font_style: "bold".to_string(),
            outline: false,
            outline_size: 4.0,
            padding_left: 2,
            framerate: 30,
            update_rate: 0.2,
            bttv_emotes: true,
            ffz_emotes: true,
            sub_messages: true,
            timestamp: false,
        }
    }
}

/// Where the chat goes on the final frame, and its optional framing images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatLayout {
    /// Offset from the top edge in pixels
    pub top: i32,
    /// Offset from the left edge in pixels
    pub left: i32,
    /// Transparent image drawn above the chat
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_image: Option<PathBuf>,
    /// Transparent image drawn below the chat
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<PathBuf>,
}

impl Default for ChatLayout {
    fn default() -> Self {
        Self {
            top: 10,
            left: 10,
            border_image: None,
            background_image: None,
        }
    }
}

/// User-supplied encoder argument templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgumentTemplates {
    /// Encoder input arguments for the chat render
    pub input_args: String,
    /// Encoder output arguments for the chat render
    pub output_args: String,
    /// Encoder arguments for the final composition
    pub composer_args: String,
}

impl Default for ArgumentTemplates {
    fn default() -> Self {
        Self {
            input_args: DEFAULT_RENDER_INPUT_ARGS.to_string(),
            output_args: DEFAULT_RENDER_OUTPUT_ARGS.to_string(),
            composer_args: DEFAULT_COMPOSER_ARGS.to_string(),
        }
    }
}

/// A request to download content plus chat and burn the chat into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionRequest {
    /// VOD id (digits) or clip slug
    pub id: String,
    /// Quality selector passed to the media acquirer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    /// Final composed file
    pub output_path: PathBuf,
    #[serde(default)]
    pub crop: CropWindow,
    #[serde(default)]
    pub style: RenderStyle,
    #[serde(default)]
    pub layout: ChatLayout,
    #[serde(default)]
    pub templates: ArgumentTemplates,
    /// Encoder executable
    pub encoder_path: PathBuf,
    /// Cache folder for the chat renderer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    /// Parallel segment downloads for VODs
    #[serde(default = "default_download_threads")]
    pub download_threads: usize,
    /// Credential for subscriber-only VODs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<String>,
    /// Keep the intermediate files after the run
    #[serde(default)]
    pub retain_intermediates: bool,
}

fn default_download_threads() -> usize {
    DEFAULT_DOWNLOAD_THREADS
}

impl CompositionRequest {
    /// Create a request with default styling, layout and templates.
    pub fn new(
        id: impl Into<String>,
        output_path: impl Into<PathBuf>,
        encoder_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            quality: None,
            output_path: output_path.into(),
            crop: CropWindow::default(),
            style: RenderStyle::default(),
            layout: ChatLayout::default(),
            templates: ArgumentTemplates::default(),
            encoder_path: encoder_path.into(),
            temp_dir: None,
            download_threads: DEFAULT_DOWNLOAD_THREADS,
            oauth: None,
            retain_intermediates: false,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_crop(mut self, crop: CropWindow) -> Self {
        self.crop = crop;
        self
    }

    pub fn with_layout(mut self, layout: ChatLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_templates(mut self, templates: ArgumentTemplates) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn retain_intermediates(mut self, retain: bool) -> Self {
        self.retain_intermediates = retain;
        self
    }
}
