//! Progress reporting for compositions.
//!
//! The pipeline emits [`ProgressReport`]s through a [`ProgressSender`]
//! without knowing where they end up (terminal, log, UI).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Default channel capacity for progress reports.
pub const DEFAULT_PROGRESS_BUFFER: usize = 256;

/// Progress event emitted during a composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ProgressReport {
    /// Stage status line
    Message(String),
    /// Completion of the current stage, 0-100
    Percent(u8),
    /// Log line meant for the user
    Log(String),
}

/// Progress sender for async contexts.
///
/// Uses a bounded channel so the pipeline never blocks on a slow observer.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::Sender<ProgressReport>>,
}

impl ProgressSender {
    pub fn new(tx: mpsc::Sender<ProgressReport>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sender that discards every report.
    pub fn noop() -> Self {
        Self { tx: None }
    }

    /// Send a report (non-blocking).
    pub fn send(&self, report: ProgressReport) {
        if let Some(tx) = &self.tx {
            // Drop reports if the channel is full or closed
            let _ = tx.try_send(report);
        }
    }

    pub fn message(&self, message: impl Into<String>) {
        self.send(ProgressReport::Message(message.into()));
    }

    pub fn percent(&self, percent: u8) {
        self.send(ProgressReport::Percent(percent.min(100)));
    }

    pub fn log(&self, line: impl Into<String>) {
        self.send(ProgressReport::Log(line.into()));
    }
}

/// Create a connected progress sender and receiver.
pub fn channel(buffer: usize) -> (ProgressSender, mpsc::Receiver<ProgressReport>) {
    let (tx, rx) = mpsc::channel(buffer);
    (ProgressSender::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_arrive_in_order() {
        let (progress, mut rx) = channel(8);
        progress.message("Downloading clip");
        progress.percent(150);
        progress.log("FINISHED. RENDER TIME: 3s");
        drop(progress);

        let mut reports = Vec::new();
        while let Some(report) = rx.recv().await {
            reports.push(report);
        }

        assert_eq!(
            reports,
            vec![
                ProgressReport::Message("Downloading clip".to_string()),
                ProgressReport::Percent(100),
                ProgressReport::Log("FINISHED. RENDER TIME: 3s".to_string()),
            ]
        );
    }

    #[test]
    fn test_full_channel_drops_reports() {
        let (progress, mut rx) = channel(1);
        progress.percent(1);
        progress.percent(2);

        assert_eq!(rx.try_recv().ok(), Some(ProgressReport::Percent(1)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_noop_sender() {
        ProgressSender::noop().message("ignored");
    }

    #[test]
    fn test_report_serialization() {
        let json = serde_json::to_string(&ProgressReport::Percent(42)).unwrap();
        assert_eq!(json, r#"{"type":"percent","data":42}"#);
    }
}
