//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` where a
//! configuration or parse failure can reach them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shorthand result type for `velo-core`.
pub type CoreResult<T> = Result<T, CoreError>;
