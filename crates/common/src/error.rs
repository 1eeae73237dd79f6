//! Error types shared across Blaster crates.

use std::path::PathBuf;

/// Top-level error type for Blaster operations.
#[derive(Debug, thiserror::Error)]
pub enum BlasterError {
    #[error("Media load error: {message}")]
    MediaLoad { message: String },

    #[error("Unsupported media type: {mime}")]
    UnsupportedMedia { mime: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Recording error: {message}")]
    Recording { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using BlasterError.
pub type BlasterResult<T> = Result<T, BlasterError>;

impl BlasterError {
    pub fn media_load(msg: impl Into<String>) -> Self {
        Self::MediaLoad {
            message: msg.into(),
        }
    }

    pub fn unsupported_media(mime: impl Into<String>) -> Self {
        Self::UnsupportedMedia { mime: mime.into() }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn recording(msg: impl Into<String>) -> Self {
        Self::Recording {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error only affects a single media item and can be
    /// absorbed without touching the rest of the session.
    pub fn is_per_item(&self) -> bool {
        matches!(
            self,
            Self::MediaLoad { .. }
                | Self::UnsupportedMedia { .. }
                | Self::Decode { .. }
                | Self::FileNotFound { .. }
        )
    }
}
