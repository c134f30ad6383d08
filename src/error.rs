//! Crate-wide error type.
//!
//! Every variant maps to a stable process exit code so the `gst` binary can
//! report failures to scripts without parsing messages.

use thiserror::Error;

use crate::fit::selection::SweepCandidate;

#[derive(Error, Debug)]
pub enum GrainError {
    /// Malformed bin count, negative left edge, volume target out of range, ...
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Sample too small or too uniform to build a meaningful histogram.
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// The least-squares solver stopped without meeting its tolerances.
    #[error("{}", fit_failure_message(.num_classes, .reason))]
    FitDidNotConverge {
        num_classes: Option<usize>,
        reason: String,
    },

    /// No candidate of the resolution sweep produced a usable fit.
    ///
    /// All candidates (with their individual failures) are kept for diagnostics.
    #[error("no viable resolution: all {} candidate class counts failed to fit", .candidates.len())]
    NoViableResolution { candidates: Vec<SweepCandidate> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GrainError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateInput(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            GrainError::InvalidArgument(_)
            | GrainError::Io(_)
            | GrainError::Csv(_)
            | GrainError::Json(_) => 2,
            GrainError::DegenerateInput(_) => 3,
            GrainError::FitDidNotConverge { .. } | GrainError::NoViableResolution { .. } => 4,
        }
    }
}

fn fit_failure_message(num_classes: &Option<usize>, reason: &str) -> String {
    match num_classes {
        Some(n) => format!("fit did not converge ({n} classes): {reason}"),
        None => format!("fit did not converge: {reason}"),
    }
}

pub type Result<T> = std::result::Result<T, GrainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(GrainError::invalid("x").exit_code(), 2);
        assert_eq!(GrainError::degenerate("x").exit_code(), 3);
        let err = GrainError::FitDidNotConverge {
            num_classes: Some(12),
            reason: "budget".to_string(),
        };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "fit did not converge (12 classes): budget");
    }
}
