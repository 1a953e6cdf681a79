//! Error types for the orbit core.
//!
//! Almost nothing in a command session is allowed to fail outward: skills,
//! the registry and the classifier all answer with strings. These errors
//! cover the seams that genuinely can fail (configuration, speech capture
//! devices, worker threads).

/// Top-level error type for the assistant core.
#[derive(Debug, thiserror::Error)]
pub enum OrbitError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Speech capture (microphone or recognition service) error.
    #[error("capture error: {0}")]
    Capture(String),

    /// Speech output error.
    #[error("speech error: {0}")]
    Speech(String),

    /// Session supervision error.
    #[error("session error: {0}")]
    Session(String),

    /// Application registry error.
    #[error("registry error: {0}")]
    Registry(#[from] orbit_apps::AppsError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, OrbitError>;
