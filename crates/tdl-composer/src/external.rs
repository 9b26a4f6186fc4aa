//! Collaborators backed by an external TwitchDownloaderCLI-compatible tool.
//!
//! Each stage is one run of the tool in the matching mode:
//!
//! | Stage        | Mode            |
//! |--------------|-----------------|
//! | VOD download | `VideoDownload` |
//! | Clip download| `ClipDownload`  |
//! | Chat download| `ChatDownload`  |
//! | Chat render  | `ChatRender`    |

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use tdl_media::{CancelSignal, MediaError, ProcessRunner};

use crate::collaborators::{
    ChatAcquirer, ChatAcquisition, ChatRenderJob, ChatRenderer, ClipAcquirer, ClipAcquisition,
    VideoAcquirer, VideoAcquisition,
};
use crate::error::{ComposeError, ComposeResult};
use crate::progress::ProgressSender;

/// Runs the downloader CLI for every acquisition and render stage.
#[derive(Debug, Clone)]
pub struct ExternalDownloader {
    program: PathBuf,
}

impl ExternalDownloader {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(
        &self,
        mode: &str,
        args: Vec<OsString>,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> Result<(), MediaError> {
        info!(program = %self.program.display(), mode, "Running downloader");

        let runner = ProcessRunner::new(&self.program).with_cancel(cancel);
        let outcome = runner
            .run(args, progress.clone(), |progress, line| {
                debug!(target: "tdl::downloader", "{}", line);
                if let Some(percent) = parse_status_percent(line) {
                    progress.percent(percent);
                }
            })
            .await?;

        outcome.into_result(runner.program()).map(|_| ())
    }
}

/// Builder for downloader argument vectors.
#[derive(Debug, Default)]
struct Args(Vec<OsString>);

impl Args {
    fn mode(mode: &str) -> Self {
        let mut args = Self::default();
        args.push("-m", mode);
        args
    }

    fn push(&mut self, flag: &str, value: impl Into<OsString>) {
        self.0.push(flag.into());
        self.0.push(value.into());
    }

    fn push_opt(&mut self, flag: &str, value: Option<impl Into<OsString>>) {
        if let Some(value) = value {
            self.push(flag, value);
        }
    }

    fn switch(&mut self, flag: &str, enabled: bool) {
        if enabled {
            self.0.push(flag.into());
        }
    }

    fn crop(&mut self, begin: Option<f64>, end: Option<f64>) {
        self.push_opt("-b", begin.map(|s| s.to_string()));
        self.push_opt("-e", end.map(|s| s.to_string()));
    }
}

fn video_args(job: &VideoAcquisition) -> Vec<OsString> {
    let mut args = Args::mode("VideoDownload");
    args.push("-u", job.id.as_str());
    args.push("-o", job.output.as_os_str());
    args.push_opt("-q", job.quality.as_deref());
    args.crop(job.crop.begin, job.crop.end);
    args.push("-t", job.threads.to_string());
    args.push_opt("--oauth", job.oauth.as_deref());
    args.push_opt("--temp-path", job.temp_dir.as_deref().map(Path::as_os_str));
    args.0
}

fn clip_args(job: &ClipAcquisition) -> Vec<OsString> {
    let mut args = Args::mode("ClipDownload");
    args.push("-u", job.id.as_str());
    args.push("-o", job.output.as_os_str());
    args.push_opt("-q", job.quality.as_deref());
    args.0
}

fn chat_args(job: &ChatAcquisition) -> Vec<OsString> {
    let mut args = Args::mode("ChatDownload");
    args.push("-u", job.id.as_str());
    args.push("-o", job.output.as_os_str());
    args.crop(job.crop.begin, job.crop.end);
    args.switch("--timestamp", job.timestamp);
    args.switch("--embed-emotes", true);
    args.0
}

fn render_args(job: &ChatRenderJob) -> Vec<OsString> {
    let style = &job.style;
    let mut args = Args::mode("ChatRender");
    args.push("-i", job.input.as_os_str());
    args.push("-o", job.output.as_os_str());
    args.push("--background-color", style.background_color.as_str());
    args.push("--message-color", style.message_color.as_str());
    args.push("-h", style.chat_height.to_string());
    args.push("-w", style.chat_width.to_string());
    args.push("--bttv", style.bttv_emotes.to_string());
    args.push("--ffz", style.ffz_emotes.to_string());
    args.push("--sub-messages", style.sub_messages.to_string());
    args.push("--outline", style.outline.to_string());
    args.push("--outline-size", style.outline_size.to_string());
    args.push("-f", style.font.as_str());
    args.push("--font-size", style.font_size.to_string());
    args.push("--message-fontstyle", style.message_font_style.as_str());
    args.push("--username-fontstyle", style.username_font_style.as_str());
    args.push("--padding-left", style.padding_left.to_string());
    args.push("--framerate", style.framerate.to_string());
    args.push("--update-rate", style.update_rate.to_string());
    args.switch("--timestamp", style.timestamp);
    args.switch("--generate-mask", true);
    args.push("--input-args", job.input_args.as_str());
    args.push("--output-args", job.output_args.as_str());
    args.push("--ffmpeg-path", job.encoder_path.as_os_str());
    args.push_opt("--temp-path", job.temp_dir.as_deref().map(Path::as_os_str));
    args.0
}

/// Percentage from a downloader status line such as `[STATUS] - Downloading 45%`.
fn parse_status_percent(line: &str) -> Option<u8> {
    let token = line.trim_end().rsplit(' ').next()?;
    let digits = token.strip_suffix('%')?;
    let value: f64 = digits.parse().ok()?;
    Some(value.clamp(0.0, 100.0) as u8)
}

#[async_trait]
impl VideoAcquirer for ExternalDownloader {
    async fn acquire_video(
        &self,
        job: &VideoAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()> {
        self.run("VideoDownload", video_args(job), progress, cancel)
            .await
            .map_err(ComposeError::from_acquisition)
    }
}

#[async_trait]
impl ClipAcquirer for ExternalDownloader {
    async fn acquire_clip(
        &self,
        job: &ClipAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()> {
        self.run("ClipDownload", clip_args(job), progress, cancel)
            .await
            .map_err(ComposeError::from_acquisition)
    }
}

#[async_trait]
impl ChatAcquirer for ExternalDownloader {
    async fn acquire_chat(
        &self,
        job: &ChatAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()> {
        self.run("ChatDownload", chat_args(job), progress, cancel)
            .await
            .map_err(ComposeError::from_acquisition)
    }
}

#[async_trait]
impl ChatRenderer for ExternalDownloader {
    async fn render_chat(
        &self,
        job: &ChatRenderJob,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()> {
        self.run("ChatRender", render_args(job), progress, cancel)
            .await
            .map_err(ComposeError::from_render)?;

        ensure_mask(&job.mask_output).await
    }
}

/// The renderer must leave the alpha mask next to the chat video.
async fn ensure_mask(mask: &Path) -> ComposeResult<()> {
    let exists = tokio::fs::try_exists(mask)
        .await
        .map_err(|e| ComposeError::from_render(MediaError::Io(e)))?;
    if !exists {
        return Err(ComposeError::render(format!(
            "renderer did not produce mask {}",
            mask.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdl_models::{CropWindow, RenderStyle};

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(String::as_str)
    }

    #[test]
    fn test_video_args() {
        let job = VideoAcquisition {
            id: "1234567890".to_string(),
            output: PathBuf::from("/out/vod_raw.mp4"),
            quality: Some("720p60".to_string()),
            crop: CropWindow::new(Some(30.0), Some(90.5)),
            threads: 4,
            oauth: None,
            temp_dir: None,
        };
        let args = strings(video_args(&job));

        assert_eq!(&args[..2], ["-m", "VideoDownload"]);
        assert_eq!(flag_value(&args, "-u"), Some("1234567890"));
        assert_eq!(flag_value(&args, "-o"), Some("/out/vod_raw.mp4"));
        assert_eq!(flag_value(&args, "-q"), Some("720p60"));
        assert_eq!(flag_value(&args, "-b"), Some("30"));
        assert_eq!(flag_value(&args, "-e"), Some("90.5"));
        assert_eq!(flag_value(&args, "-t"), Some("4"));
        assert!(!args.iter().any(|a| a == "--oauth"));
    }

    #[test]
    fn test_clip_args_skip_missing_quality() {
        let job = ClipAcquisition {
            id: "AbCdEfGh".to_string(),
            output: PathBuf::from("clip_raw.mp4"),
            quality: None,
        };
        assert_eq!(
            strings(clip_args(&job)),
            vec!["-m", "ClipDownload", "-u", "AbCdEfGh", "-o", "clip_raw.mp4"]
        );
    }

    #[test]
    fn test_chat_args() {
        let job = ChatAcquisition {
            id: "AbCdEfGh".to_string(),
            output: PathBuf::from("clip_chat.json"),
            crop: CropWindow::default(),
            timestamp: true,
        };
        let args = strings(chat_args(&job));

        assert_eq!(flag_value(&args, "-m"), Some("ChatDownload"));
        assert!(args.contains(&"--timestamp".to_string()));
        assert!(args.contains(&"--embed-emotes".to_string()));
        assert!(!args.contains(&"-b".to_string()));
    }

    #[test]
    fn test_render_args_request_mask() {
        let job = ChatRenderJob {
            input: PathBuf::from("clip_chat.json"),
            output: PathBuf::from("clip_chat.mp4"),
            mask_output: PathBuf::from("clip_chat_mask.mp4"),
            style: RenderStyle::default(),
            encoder_path: PathBuf::from("/usr/bin/ffmpeg"),
            temp_dir: Some(PathBuf::from("/tmp/cache")),
            input_args: "-i -".to_string(),
            output_args: "\"{save_path}\"".to_string(),
        };
        let args = strings(render_args(&job));

        assert_eq!(flag_value(&args, "-m"), Some("ChatRender"));
        assert!(args.contains(&"--generate-mask".to_string()));
        assert_eq!(flag_value(&args, "-h"), Some("600"));
        assert_eq!(flag_value(&args, "-w"), Some("350"));
        assert_eq!(flag_value(&args, "--framerate"), Some("30"));
        assert_eq!(flag_value(&args, "--update-rate"), Some("0.2"));
        assert_eq!(flag_value(&args, "--ffmpeg-path"), Some("/usr/bin/ffmpeg"));
        assert_eq!(flag_value(&args, "--temp-path"), Some("/tmp/cache"));
        assert_eq!(flag_value(&args, "--output-args"), Some("\"{save_path}\""));
    }

    #[test]
    fn test_parse_status_percent() {
        assert_eq!(parse_status_percent("[STATUS] - Downloading 45%"), Some(45));
        assert_eq!(parse_status_percent("[STATUS] - Rendering 99.6%  "), Some(99));
        assert_eq!(parse_status_percent("[STATUS] - Fetching chat"), None);
        assert_eq!(parse_status_percent(""), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_run_maps_to_acquisition() {
        let downloader = ExternalDownloader::new("/bin/false");
        let job = ClipAcquisition {
            id: "AbCdEfGh".to_string(),
            output: PathBuf::from("clip_raw.mp4"),
            quality: None,
        };

        let err = downloader
            .acquire_clip(&job, &ProgressSender::noop(), CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "acquisition");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_requires_mask() {
        let dir = tempfile::tempdir().unwrap();
        let downloader = ExternalDownloader::new("/bin/true");
        let job = ChatRenderJob {
            input: dir.path().join("c_chat.json"),
            output: dir.path().join("c_chat.mp4"),
            mask_output: dir.path().join("c_chat_mask.mp4"),
            style: RenderStyle::default(),
            encoder_path: PathBuf::from("ffmpeg"),
            temp_dir: None,
            input_args: String::new(),
            output_args: String::new(),
        };

        let err = downloader
            .render_chat(&job, &ProgressSender::noop(), CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "render");

        std::fs::write(&job.mask_output, b"").unwrap();
        downloader
            .render_chat(&job, &ProgressSender::noop(), CancelSignal::never())
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_mask_path_is_a_render_failure() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("chat.json");
        std::fs::write(&not_a_dir, b"{}").unwrap();

        let err = ensure_mask(&not_a_dir.join("c_chat_mask.mp4"))
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "render");
        assert!(std::error::Error::source(&err).is_some());
    }
}
