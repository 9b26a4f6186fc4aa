//! Composer error types.

use thiserror::Error;

use tdl_media::MediaError;

pub type ComposeResult<T> = Result<T, ComposeError>;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Acquisition failed: {message}")]
    Acquisition {
        message: String,
        #[source]
        source: Option<MediaError>,
    },

    #[error("Chat render failed: {message}")]
    Render {
        message: String,
        #[source]
        source: Option<MediaError>,
    },

    #[error("Probe failed: {0}")]
    Probe(#[source] MediaError),

    #[error("Composition failed: {message}")]
    Composition {
        message: String,
        exit_code: Option<i32>,
        stderr: Option<String>,
        #[source]
        source: Option<MediaError>,
    },

    #[error("Composition cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComposeError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn acquisition(msg: impl Into<String>) -> Self {
        Self::Acquisition {
            message: msg.into(),
            source: None,
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
            source: None,
        }
    }

    /// Classify a media error raised while acquiring content or chat.
    pub fn from_acquisition(err: MediaError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Acquisition {
            message: describe(&err),
            source: Some(err),
        }
    }

    /// Classify a media error raised while rendering chat.
    pub fn from_render(err: MediaError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Render {
            message: describe(&err),
            source: Some(err),
        }
    }

    /// Classify a media error raised while probing the source video.
    pub fn from_probe(err: MediaError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Probe(err)
    }

    /// Classify a media error raised by the final encoder run.
    pub fn from_composition(err: MediaError) -> Self {
        if err.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Composition {
            message: err.to_string(),
            exit_code: err.exit_code(),
            stderr: err.stderr().map(str::to_string),
            source: Some(err),
        }
    }

    /// Check if the composition was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ComposeError::Cancelled)
    }

    /// Exit code of the failed external process, if one ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ComposeError::Composition { exit_code, .. } => *exit_code,
            other => other.media_source().and_then(MediaError::exit_code),
        }
    }

    /// Captured stderr tail of the failed external process.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ComposeError::Composition { stderr, .. } => stderr.as_deref(),
            other => other.media_source().and_then(MediaError::stderr),
        }
    }

    fn media_source(&self) -> Option<&MediaError> {
        match self {
            ComposeError::Acquisition { source, .. }
            | ComposeError::Render { source, .. }
            | ComposeError::Composition { source, .. } => source.as_ref(),
            ComposeError::Probe(err) => Some(err),
            _ => None,
        }
    }

    /// Pipeline stage the error belongs to.
    pub fn stage(&self) -> &'static str {
        match self {
            ComposeError::InvalidRequest(_) => "validation",
            ComposeError::Acquisition { .. } => "acquisition",
            ComposeError::Render { .. } => "render",
            ComposeError::Probe(_) => "probe",
            ComposeError::Composition { .. } => "composition",
            ComposeError::Cancelled => "cancelled",
            ComposeError::Io(_) => "io",
        }
    }
}

/// Error text with the tail of the process stderr, when there is one.
fn describe(err: &MediaError) -> String {
    match err.stderr() {
        Some(stderr) => format!("{err}\n{stderr}"),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;
    use std::io;

    use super::*;

    fn spawn_failure() -> MediaError {
        MediaError::SpawnFailed {
            program: "ffmpeg".into(),
            source: io::Error::from(io::ErrorKind::PermissionDenied),
        }
    }

    #[test]
    fn test_cancellation_is_preserved() {
        assert!(ComposeError::from_acquisition(MediaError::Cancelled).is_cancelled());
        assert!(ComposeError::from_render(MediaError::Cancelled).is_cancelled());
        assert!(ComposeError::from_probe(MediaError::Cancelled).is_cancelled());
        assert!(ComposeError::from_composition(MediaError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_composition_keeps_exit_details() {
        let err = ComposeError::from_composition(MediaError::process_failed(
            "ffmpeg",
            Some(1),
            Some("Invalid argument".to_string()),
        ));
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.stderr(), Some("Invalid argument"));

        match err {
            ComposeError::Composition {
                exit_code, stderr, ..
            } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr.as_deref(), Some("Invalid argument"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_acquisition_message_includes_stderr() {
        let err = ComposeError::from_acquisition(MediaError::process_failed(
            "TwitchDownloaderCLI",
            Some(2),
            Some("Clip not found".to_string()),
        ));
        assert_eq!(err.stage(), "acquisition");
        assert!(err.to_string().contains("Clip not found"));
        assert_eq!(err.exit_code(), Some(2));
    }

    #[test]
    fn test_media_errors_stay_in_the_cause_chain() {
        for err in [
            ComposeError::from_acquisition(spawn_failure()),
            ComposeError::from_render(spawn_failure()),
            ComposeError::from_composition(spawn_failure()),
        ] {
            let cause = err.source().expect("media error kept as source");
            let io_cause = cause.source().expect("spawn error kept as source");
            assert_eq!(
                io_cause.downcast_ref::<io::Error>().map(io::Error::kind),
                Some(io::ErrorKind::PermissionDenied)
            );
        }
    }

    #[test]
    fn test_message_only_errors_have_no_source() {
        assert!(ComposeError::render("font not found").source().is_none());
        assert!(ComposeError::acquisition("no output").source().is_none());
    }
}
