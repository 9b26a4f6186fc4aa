//! Batch composition of Twitch content with rendered chat.
//!
//! Downloads a VOD or clip and its chat, renders the chat to video and
//! burns it into the source with a single encoder run.

pub mod cleanup;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod external;
pub mod logging;
pub mod pipeline;
pub mod progress;

pub use cleanup::{cleanup, CleanupFailure, CleanupReport};
pub use collaborators::{
    ChatAcquirer, ChatAcquisition, ChatRenderJob, ChatRenderer, ClipAcquirer, ClipAcquisition,
    Collaborators, VideoAcquirer, VideoAcquisition,
};
pub use config::ComposerConfig;
pub use error::{ComposeError, ComposeResult};
pub use external::ExternalDownloader;
pub use logging::ComposeLogger;
pub use pipeline::{BatchComposer, CompositionOutcome};
pub use progress::{ProgressReport, ProgressSender};
