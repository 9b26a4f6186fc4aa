//! Structured composition logging.

use tracing::{error, info, warn, Span};

use tdl_models::CompositionId;

/// Logger carrying the composition and content ids on every event.
#[derive(Debug, Clone)]
pub struct ComposeLogger {
    composition_id: String,
    content_id: String,
}

impl ComposeLogger {
    pub fn new(composition_id: &CompositionId, content_id: &str) -> Self {
        Self {
            composition_id: composition_id.to_string(),
            content_id: content_id.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            composition_id = %self.composition_id,
            content_id = %self.content_id,
            "Composition started: {}", message
        );
    }

    /// Log the start of a pipeline stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(
            composition_id = %self.composition_id,
            content_id = %self.content_id,
            stage,
            "{}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            composition_id = %self.composition_id,
            content_id = %self.content_id,
            "Composition warning: {}", message
        );
    }

    pub fn log_error(&self, stage: &str, message: &str) {
        error!(
            composition_id = %self.composition_id,
            content_id = %self.content_id,
            stage,
            "Composition failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            composition_id = %self.composition_id,
            content_id = %self.content_id,
            "Composition completed: {}", message
        );
    }

    pub fn composition_id(&self) -> &str {
        &self.composition_id
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    /// Span wrapping a whole composition run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "composition",
            composition_id = %self.composition_id,
            content_id = %self.content_id
        )
    }
}
