use crate::template::model::AnchorMode;

/// Convenience result type used across photoslot.
pub type PhotoslotResult<T> = Result<T, PhotoslotError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum PhotoslotError {
    /// Template, slot, or settings data violates an invariant.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// The anchor for a photo could not be resolved.
    #[error(transparent)]
    Anchor(#[from] AnchorFailure),

    /// A pixel buffer is empty or disagrees with its declared dimensions.
    #[error("input mismatch: {0}")]
    InputMismatch(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from codecs or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhotoslotError {
    /// Build a [`PhotoslotError::ConfigInvalid`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigInvalid(msg.into())
    }

    /// Build a [`PhotoslotError::InputMismatch`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InputMismatch(msg.into())
    }

    /// Build a [`PhotoslotError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` when the failure came from a missing detection, which callers may
    /// retry with a degraded anchor mode.
    pub fn is_no_detection(&self) -> bool {
        matches!(self, Self::Anchor(AnchorFailure::NoDetection { .. }))
    }
}

impl From<serde_json::Error> for PhotoslotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Reasons an anchor observation could not be produced for a photo.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum AnchorFailure {
    /// The detection backend found no subject, or one below the confidence threshold.
    #[error("no detection for anchor mode '{mode}'")]
    NoDetection {
        /// Anchor mode that required the detection.
        mode: AnchorMode,
    },

    /// The backend returned a point but no feature size, and settings require one.
    #[error("detection for anchor mode '{mode}' has no feature size")]
    MissingFeatureSize {
        /// Anchor mode that required the feature size.
        mode: AnchorMode,
    },

    /// The detection carried non-finite or non-positive values.
    #[error("invalid detection: {0}")]
    InvalidDetection(String),
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
