//! Best-effort removal of intermediate files.

use std::io::ErrorKind;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use tdl_models::IntermediateArtifacts;

/// A path that could not be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub path: PathBuf,
    pub error: String,
}

/// What a cleanup pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Whether the pass was skipped because retention was requested
    pub retained: bool,
    pub removed: Vec<PathBuf>,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Remove every existing intermediate file unless `retain` is set.
///
/// Missing files are skipped. Removal errors are logged and collected,
/// never returned.
pub async fn cleanup(artifacts: &IntermediateArtifacts, retain: bool) -> CleanupReport {
    let mut report = CleanupReport {
        retained: retain,
        ..Default::default()
    };
    if retain {
        debug!("Retaining intermediate files");
        return report;
    }

    for path in artifacts.all() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed intermediate file");
                report.removed.push(path.to_path_buf());
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove intermediate file");
                report.failures.push(CleanupFailure {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifacts_in(dir: &std::path::Path) -> IntermediateArtifacts {
        IntermediateArtifacts::derive(dir.join("out.mp4")).unwrap()
    }

    #[tokio::test]
    async fn test_removes_existing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        std::fs::write(&artifacts.raw_video, b"raw").unwrap();
        std::fs::write(&artifacts.chat_json, b"{}").unwrap();

        let report = cleanup(&artifacts, false).await;

        assert!(report.is_clean());
        assert_eq!(
            report.removed,
            vec![artifacts.raw_video.clone(), artifacts.chat_json.clone()]
        );
        assert!(artifacts.all().iter().all(|p| !p.exists()));
    }

    #[tokio::test]
    async fn test_retain_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        std::fs::write(&artifacts.raw_video, b"raw").unwrap();

        let report = cleanup(&artifacts, true).await;

        assert!(report.retained);
        assert!(report.removed.is_empty());
        assert!(artifacts.raw_video.exists());
    }

    #[tokio::test]
    async fn test_failures_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = artifacts_in(dir.path());
        // A directory cannot be removed with remove_file
        std::fs::create_dir(&artifacts.chat_video).unwrap();
        std::fs::write(&artifacts.chat_mask, b"mask").unwrap();

        let report = cleanup(&artifacts, false).await;

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, artifacts.chat_video);
        assert_eq!(report.removed, vec![artifacts.chat_mask.clone()]);
    }
}
