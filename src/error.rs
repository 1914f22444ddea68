//! Error taxonomy for appliance load generation.

use std::path::PathBuf;

use thiserror::Error;

/// A violated input contract, with the dotted field path that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid {field}: {message}")]
pub struct ValidationError {
    /// Dotted field path (e.g., `"schedule.weekday.hour_probabilities"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure while generating one appliance's series.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A week (or legacy day) cannot hold its quota without overlap.
    #[error(
        "capacity exceeded in {period}: {required} activations of {duration_slots} slots \
         requested but at most {available} fit without overlap"
    )]
    Capacity {
        /// Period label such as `"2024-W27"` or `"2024-07-03"`.
        period: String,
        required: usize,
        available: usize,
        duration_slots: usize,
    },

    /// Referenced pattern directory or template curves are missing.
    #[error("pattern templates not found at {}: {reason}", path.display())]
    TemplateNotFound { path: PathBuf, reason: String },
}

/// Error surfaced to the caller, naming the appliance it belongs to.
#[derive(Debug, Error)]
#[error("appliance `{appliance}`: {source}")]
pub struct ApplianceError {
    pub appliance: String,
    pub source: GenerationError,
}

impl ApplianceError {
    pub fn new(appliance: impl Into<String>, source: impl Into<GenerationError>) -> Self {
        Self {
            appliance: appliance.into(),
            source: source.into(),
        }
    }
}
