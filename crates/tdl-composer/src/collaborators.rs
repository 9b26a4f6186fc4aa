//! Stage collaborators.
//!
//! The pipeline only sequences stages; fetching media and chat and turning
//! chat into video is delegated to these traits.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use tdl_media::CancelSignal;
use tdl_models::{CropWindow, RenderStyle};

use crate::error::ComposeResult;
use crate::progress::ProgressSender;

/// Full VOD download.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAcquisition {
    pub id: String,
    pub output: PathBuf,
    pub quality: Option<String>,
    pub crop: CropWindow,
    /// Parallel segment downloads
    pub threads: usize,
    pub oauth: Option<String>,
    pub temp_dir: Option<PathBuf>,
}

/// Clip download.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAcquisition {
    pub id: String,
    pub output: PathBuf,
    pub quality: Option<String>,
}

/// Chat transcript download in JSON interchange format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatAcquisition {
    pub id: String,
    pub output: PathBuf,
    pub crop: CropWindow,
    pub timestamp: bool,
}

/// Chat transcript to color and alpha-mask video.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRenderJob {
    pub input: PathBuf,
    /// Color stream
    pub output: PathBuf,
    /// Alpha-mask stream the renderer must produce next to `output`
    pub mask_output: PathBuf,
    pub style: RenderStyle,
    pub encoder_path: PathBuf,
    pub temp_dir: Option<PathBuf>,
    pub input_args: String,
    pub output_args: String,
}

#[async_trait]
pub trait VideoAcquirer: Send + Sync {
    async fn acquire_video(
        &self,
        job: &VideoAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()>;
}

#[async_trait]
pub trait ClipAcquirer: Send + Sync {
    async fn acquire_clip(
        &self,
        job: &ClipAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()>;
}

#[async_trait]
pub trait ChatAcquirer: Send + Sync {
    async fn acquire_chat(
        &self,
        job: &ChatAcquisition,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()>;
}

#[async_trait]
pub trait ChatRenderer: Send + Sync {
    /// Render both the color and the mask stream.
    async fn render_chat(
        &self,
        job: &ChatRenderJob,
        progress: &ProgressSender,
        cancel: CancelSignal,
    ) -> ComposeResult<()>;
}

/// The four collaborators a composition needs.
#[derive(Clone)]
pub struct Collaborators {
    pub video: Arc<dyn VideoAcquirer>,
    pub clip: Arc<dyn ClipAcquirer>,
    pub chat: Arc<dyn ChatAcquirer>,
    pub renderer: Arc<dyn ChatRenderer>,
}

impl Collaborators {
    pub fn new(
        video: Arc<dyn VideoAcquirer>,
        clip: Arc<dyn ClipAcquirer>,
        chat: Arc<dyn ChatAcquirer>,
        renderer: Arc<dyn ChatRenderer>,
    ) -> Self {
        Self {
            video,
            clip,
            chat,
            renderer,
        }
    }

    /// Use one implementation for every stage.
    pub fn shared<T>(inner: Arc<T>) -> Self
    where
        T: VideoAcquirer + ClipAcquirer + ChatAcquirer + ChatRenderer + 'static,
    {
        Self {
            video: inner.clone(),
            clip: inner.clone(),
            chat: inner.clone(),
            renderer: inner,
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
