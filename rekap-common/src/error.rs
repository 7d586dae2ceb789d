//! Common error types for the rekap crates

use thiserror::Error;

/// Common result type for rekap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the rekap crates
///
/// Malformed upstream *data* never surfaces here; it is normalized to
/// zero/absent values instead. Only malformed invocations and configuration
/// loading produce errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration text failed to parse
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Caller-supplied JSON text failed to parse
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid invocation (e.g. an object where an array is required)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
