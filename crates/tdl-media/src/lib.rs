//! Encoder CLI wrapper for chat compositing.
//!
//! This crate provides:
//! - Filtergraph synthesis for overlaying rendered chat on a video
//! - Dimension and duration probing from encoder diagnostics
//! - Process control with stderr streaming and cancellation via tokio
//! - Literal argument-template substitution

pub mod cancel;
pub mod command;
pub mod error;
pub mod filtergraph;
pub mod probe;
pub mod progress;
pub mod template;

pub use cancel::CancelSignal;
pub use command::{check_encoder, resolve_executable, ProcessOutcome, ProcessRunner};
pub use error::{MediaError, MediaResult};
pub use filtergraph::{
    build_filtergraph, build_mapped_inputs, synthesize, Filtergraph, MappedInput, MappedInputs,
    Stage,
};
pub use probe::{probe_dimension, probe_media, MediaProbe};
pub use progress::EncoderStats;
pub use template::{split_arguments, CompositionArguments};
