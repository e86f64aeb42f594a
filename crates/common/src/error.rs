//! Error types shared across Suncast crates.

use std::path::PathBuf;

/// Top-level error type for Suncast operations.
#[derive(Debug, thiserror::Error)]
pub enum SuncastError {
    /// A request to a remote host failed. `transient` marks transport-level
    /// failures (connect, timeout, body read) as opposed to HTTP status errors.
    #[error("Network error for {url}: {message}")]
    Network {
        url: String,
        message: String,
        transient: bool,
    },

    #[error("Archive error: {message}")]
    Archive { message: String },

    #[error("Invalid frame {path}: expected {expected:?}, found {actual:?}")]
    InvalidFrame {
        path: PathBuf,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Image error: {message}")]
    Image { message: String },

    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },

    #[error("Publish error: {message}")]
    Publish { message: String },

    #[error("Credentials error: {message}")]
    Credentials { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SuncastError.
pub type SuncastResult<T> = Result<T, SuncastError>;

impl SuncastError {
    /// Transport-level failure that is worth retrying.
    pub fn transient(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: msg.into(),
            transient: true,
        }
    }

    /// Network failure that retrying will not fix (e.g. a 404).
    pub fn network(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: msg.into(),
            transient: false,
        }
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive {
            message: msg.into(),
        }
    }

    pub fn image(msg: impl Into<String>) -> Self {
        Self::Image {
            message: msg.into(),
        }
    }

    pub fn tool(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish {
            message: msg.into(),
        }
    }

    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether this error is a transport-level network failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network {
                transient: true,
                ..
            }
        )
    }
}
