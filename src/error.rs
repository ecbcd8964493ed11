//! Error type for pipeline steps.

use thiserror::Error;

use crate::data::model::Shape;
use crate::options::LookupError;

/// Errors that abort a pipeline step.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Unknown clip method '{0}': expected 'relative' or 'absolute'")]
    InvalidClipMethod(String),

    #[error("Unknown rms mode '{0}': expected 'std', 'mad' or 'negative'")]
    InvalidRmsMode(String),

    #[error("Unknown flux range '{0}': expected 'all', 'positive' or 'negative'")]
    InvalidFluxRange(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("Data length {len} does not match shape {shape}")]
    LengthMismatch { shape: Shape, len: usize },

    #[error("No finite values available for noise estimation")]
    EmptyNoiseSample,

    #[error("Invalid flag region {index}: {reason}")]
    InvalidRegion { index: usize, reason: String },

    #[error("Unknown pipeline switch 'steps.{0}'")]
    UnknownStep(String),

    #[error("No input cube loaded; set import.inFile")]
    NoCube,

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Data(#[from] anyhow::Error),
}
