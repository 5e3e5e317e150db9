//! Error types for the control plane
//!
//! On-air commands never return these: they are for the boundaries that are
//! allowed to fail (loading configuration, persistence) and for the macro
//! sequencer, whose failures are caught and logged at the run boundary.

use thiserror::Error;

/// Errors from loading or saving control-plane data
#[derive(Debug, Error)]
pub enum ControlError {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed JSON, including unknown macro action types
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A macro failed validation when it was loaded
    #[error("invalid macro '{label}': step {step}: {reason}")]
    InvalidMacro {
        /// Label of the rejected macro
        label: String,
        /// Zero-based index of the offending action
        step: usize,
        /// What was wrong with it
        reason: String,
    },
}

/// Errors that abort a running macro
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SequencerError {
    /// Fade target outside the channel level range
    #[error("fade target {level} outside 0.0..={ceiling}")]
    InvalidLevel {
        /// Requested level
        level: f64,
        /// Highest level a channel accepts
        ceiling: f64,
    },

    /// The run was cancelled at a suspension point
    #[error("macro cancelled")]
    Cancelled,
}
