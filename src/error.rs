//! Error types for the model trainer stage

use std::fmt;
use std::panic::Location;
use thiserror::Error;

/// Result type alias for trainer operations
pub type Result<T> = std::result::Result<T, TrainerError>;

/// Main error type for the trainer
#[derive(Error, Debug)]
pub enum TrainerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Tracking error: {0}")]
    TrackingError(String),

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },
}

/// Coarse failure class of a [`TrainerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    DataLoad,
    Fit,
    Tracking,
    Persistence,
}

impl TrainerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainerError::ConfigError(_) => ErrorKind::Configuration,
            TrainerError::DataError(_) => ErrorKind::DataLoad,
            TrainerError::TrainingError(_)
            | TrainerError::ShapeError { .. }
            | TrainerError::ModelNotFitted
            | TrainerError::InvalidParameter { .. } => ErrorKind::Fit,
            TrainerError::TrackingError(_) => ErrorKind::Tracking,
            TrainerError::PersistenceError(_)
            | TrainerError::SerializationError(_)
            | TrainerError::IoError(_) => ErrorKind::Persistence,
        }
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for TrainerError {
    fn from(err: bincode::Error) -> Self {
        TrainerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TrainerError {
    fn from(err: ndarray::ShapeError) -> Self {
        TrainerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for TrainerError {
    fn from(err: reqwest::Error) -> Self {
        TrainerError::TrackingError(err.to_string())
    }
}

/// Stage-boundary error: the original cause plus the source location where
/// it crossed into the stage.
#[derive(Debug)]
pub struct StageError {
    cause: TrainerError,
    file: &'static str,
    line: u32,
}

impl StageError {
    #[track_caller]
    pub fn new(cause: TrainerError) -> Self {
        let location = Location::caller();
        Self {
            cause,
            file: location.file(),
            line: location.line(),
        }
    }

    pub fn cause(&self) -> &TrainerError {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn into_cause(self) -> TrainerError {
        self.cause
    }
}

impl From<TrainerError> for StageError {
    #[track_caller]
    fn from(cause: TrainerError) -> Self {
        StageError::new(cause)
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error occurred in {} line {}: {}",
            self.file, self.line, self.cause
        )
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TrainerError::DataError("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrainerError = io_err.into();
        assert!(matches!(err, TrainerError::IoError(_)));
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_stage_error_records_location() {
        fn fails() -> std::result::Result<(), StageError> {
            Err(TrainerError::ConfigError("empty roster".to_string()))?;
            Ok(())
        }

        let err = fails().unwrap_err();
        assert!(err.file().ends_with("error.rs"));
        assert!(err.line() > 0);
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let rendered = err.to_string();
        assert!(rendered.starts_with("error occurred in "));
        assert!(rendered.contains(&format!("line {}", err.line())));
        assert!(rendered.ends_with("Configuration error: empty roster"));
    }

    #[test]
    fn test_stage_error_source_is_cause() {
        use std::error::Error;
        let err = StageError::new(TrainerError::TrackingError("unauthorized".to_string()));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Tracking error: unauthorized");
    }
}
