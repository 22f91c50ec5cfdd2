use crate::types::{ClipId, TimeUs};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Clip not found: {0}")]
    ClipNotFound(ClipId),

    #[error("Duplicate clip id: {0}")]
    DuplicateClip(ClipId),

    #[error("Invalid duration: {0}")]
    InvalidDuration(f64),

    #[error("Invalid start time: {0}")]
    InvalidStart(TimeUs),

    #[error("Overlap detected")]
    OverlapDetected,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Failure of a request issued against the bound media element.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media element unavailable")]
    Unavailable,

    #[error("media request failed: {0}")]
    Request(String),
}
