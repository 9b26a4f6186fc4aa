//! Shared data models for the chat composition pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Composition requests and their render styling
//! - Content id classification (VOD vs clip)
//! - Intermediate artifact naming
//! - Video geometry

pub mod artifacts;
pub mod content;
pub mod dimension;
pub mod job;
pub mod request;

// Re-export common types
pub use artifacts::IntermediateArtifacts;
pub use content::{ContentKind, InvalidContentId};
pub use dimension::VideoDimension;
pub use job::CompositionId;
pub use request::{ArgumentTemplates, ChatLayout, CompositionRequest, CropWindow, RenderStyle};
