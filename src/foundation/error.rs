/// Result alias used throughout the crate.
pub type SurferResult<T> = Result<T, SurferError>;

/// Crate-wide error type.
///
/// Every error that crosses a pass boundary ends up here so it can be surfaced on the control
/// thread as a human-readable message.
#[derive(thiserror::Error, Debug)]
pub enum SurferError {
    /// The surface expression failed to compile or references unknown parameters.
    #[error("formula error: {0}")]
    Formula(String),

    /// A scene description could not be parsed or is missing required fields.
    #[error("config load error: {0}")]
    ConfigLoad(String),

    /// The evaluator failed while computing a pass on the worker thread.
    #[error("pass execution error: {0}")]
    PassExecution(String),

    /// The camera description names a projection that does not exist.
    #[error("unknown camera type: {0}")]
    UnknownCameraType(String),

    /// An argument or option is out of range.
    #[error("validation error: {0}")]
    Validation(String),

    /// The background worker is gone or refused work.
    #[error("worker error: {0}")]
    Worker(String),

    /// Anything else (I/O, serialization).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SurferError {
    /// Build a [`SurferError::Formula`].
    pub fn formula(msg: impl Into<String>) -> Self {
        Self::Formula(msg.into())
    }

    /// Build a [`SurferError::ConfigLoad`].
    pub fn config_load(msg: impl Into<String>) -> Self {
        Self::ConfigLoad(msg.into())
    }

    /// Build a [`SurferError::PassExecution`].
    pub fn pass_execution(msg: impl Into<String>) -> Self {
        Self::PassExecution(msg.into())
    }

    /// Build a [`SurferError::UnknownCameraType`].
    pub fn unknown_camera_type(name: impl Into<String>) -> Self {
        Self::UnknownCameraType(name.into())
    }

    /// Build a [`SurferError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SurferError::Worker`].
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    /// `true` for errors that invalidate the scene (as opposed to a single failed pass).
    pub fn invalidates_scene(&self) -> bool {
        matches!(self, Self::Formula(_) | Self::ConfigLoad(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
