use scrubline_core::MediaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("failed to start mpv: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("mpv socket did not appear at {0}")]
    SocketTimeout(std::path::PathBuf),

    #[error("mpv is not running")]
    NotRunning,

    #[error("mpv IPC failed: {0}")]
    Ipc(#[from] std::io::Error),

    #[error("malformed mpv reply: {0}")]
    MalformedReply(String),

    #[error("mpv did not answer {0}")]
    NoReply(String),

    #[error("mpv IPC connection closed")]
    Disconnected,

    #[error("mpv rejected {command}: {reason}")]
    Rejected { command: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PreviewError>;

impl From<PreviewError> for MediaError {
    fn from(e: PreviewError) -> Self {
        match e {
            PreviewError::NotRunning | PreviewError::Disconnected => MediaError::Unavailable,
            other => MediaError::Request(other.to_string()),
        }
    }
}
