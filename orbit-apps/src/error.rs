//! Error types for the orbit-apps crate.
//!
//! Lookups never fail from the caller's point of view: scan errors are
//! logged and swallowed by the registry. These errors surface only from
//! directory providers and configuration validation.

/// Errors that can occur while enumerating or configuring the registry.
#[derive(Debug, thiserror::Error)]
pub enum AppsError {
    /// The directory provider could not enumerate installed applications.
    #[error("scan error: {0}")]
    Scan(String),

    /// Invalid registry configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for orbit-apps results.
pub type Result<T> = std::result::Result<T, AppsError>;
