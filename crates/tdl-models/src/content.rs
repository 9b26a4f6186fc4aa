//! Content id classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error returned for ids that cannot be classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Content id cannot be classified: {0:?}")]
pub struct InvalidContentId(pub String);

/// What a content id addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Full broadcast recording, numeric id
    Vod,
    /// Short excerpt, alphanumeric slug
    Clip,
}

impl ContentKind {
    /// Classify an id lexically.
    ///
    /// Ids made only of ASCII decimal digits are VODs, anything else is a
    /// clip slug. Nothing is looked up; a numeric clip slug would be
    /// misclassified as a VOD. Whitespace is not stripped, so `" 42 "` is
    /// a clip slug.
    pub fn classify(id: &str) -> Result<Self, InvalidContentId> {
        if id.is_empty() {
            return Err(InvalidContentId(id.to_string()));
        }

        if id.chars().all(|c| c.is_ascii_digit()) {
            Ok(ContentKind::Vod)
        } else {
            Ok(ContentKind::Clip)
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Vod => "vod",
            ContentKind::Clip => "clip",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
