//! Error types for virtualizer construction and reconstruction.

use serde::{Deserialize, Serialize};
use trackvirt_api_core::ParameterError;

/// Failure of a single `create_output_animation` call. No partial curve accompanies any of these.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconstructionError {
    #[error("animation length must be positive and finite, got {length}")]
    InvalidAnimationLength { length: f32 },

    #[error("{samples} ground-truth samples requested, at least {minimum} required")]
    InsufficientSamples { samples: usize, minimum: usize },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The backend could not be started or loaded.
    #[error("estimator unavailable: {reason}")]
    EstimatorUnavailable { reason: String },

    /// The backend ran but produced no usable result.
    #[error("estimator call failed: {reason}")]
    EstimatorCallFailed { reason: String },

    #[error("malformed estimator result: {reason}")]
    MalformedEstimatorResult { reason: String },

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

impl ReconstructionError {
    /// Short static tag for log lines and metrics labels.
    pub fn category(&self) -> &'static str {
        match self {
            ReconstructionError::InvalidAnimationLength { .. }
            | ReconstructionError::InsufficientSamples { .. }
            | ReconstructionError::InvalidParameter { .. } => "configuration",
            ReconstructionError::EstimatorUnavailable { .. } => "backend",
            ReconstructionError::EstimatorCallFailed { .. }
            | ReconstructionError::MalformedEstimatorResult { .. } => "estimator",
            ReconstructionError::Parameter(_) => "parameter",
        }
    }

    /// Whether re-creating the virtualizer later may succeed. Nothing is retried internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReconstructionError::EstimatorUnavailable { .. })
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ReconstructionError::MalformedEstimatorResult {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        ReconstructionError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryError {
    #[error("unknown virtualizer type '{name}'")]
    UnknownType { name: String },

    #[error("virtualizer type '{name}' already registered with a different factory")]
    DuplicateType { name: String },
}
