use thiserror::Error;

/// Errors surfaced to the application. Messages are safe to show to the user
/// as-is; upstream detail is logged, never carried here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidRequest(String),

    /// Raised after the session-expiry handler has run.
    #[error("Your session has expired. Please sign in again.")]
    Unauthorized,

    #[error("Something went wrong. Please try again.")]
    UpstreamFailure,

    #[error("Not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Stored session is unreadable: {0}")]
    Corrupt(#[from] serde_json::Error),
}
