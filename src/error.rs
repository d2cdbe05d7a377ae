use serde::Serialize;
use thiserror::Error;

/// Failures surfaced across the command boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackingError {
    #[error("SDK key is required")]
    InvalidCredential,

    #[error("Tracking session not initialized")]
    NotInitialized,

    #[error("Exercise type and name are required")]
    InvalidExercise,

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Failed to start tracking: {0}")]
    TrackingFailed(String),

    #[error("Failed to stop tracking: {0}")]
    StopFailed(String),

    #[error("Failed to get results: {0}")]
    GetResultsFailed(String),

    #[error("Failed to dispose: {0}")]
    DisposeFailed(String),
}

impl TrackingError {
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::InvalidCredential => "INVALID_SDK_KEY",
            TrackingError::NotInitialized => "NOT_INITIALIZED",
            TrackingError::InvalidExercise => "INVALID_EXERCISE",
            TrackingError::InitializationFailed(_) => "INITIALIZATION_FAILED",
            TrackingError::TrackingFailed(_) => "TRACKING_FAILED",
            TrackingError::StopFailed(_) => "STOP_TRACKING_FAILED",
            TrackingError::GetResultsFailed(_) => "GET_RESULTS_FAILED",
            TrackingError::DisposeFailed(_) => "DISPOSE_FAILED",
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;

/// Wire form of a [`TrackingError`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl From<&TrackingError> for ErrorPayload {
    fn from(err: &TrackingError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
