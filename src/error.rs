// src/error.rs
//! Per-job error taxonomy. Every worker failure is captured into its job's
//! result as one of these; nothing here crosses a task boundary as a panic.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP/network failure, including non-success status codes.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The feed body could not be parsed into entries.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// The linked page yielded no usable image.
    #[error("no image found for {0}")]
    ImageNotFound(String),

    #[error("failed to encode image: {0}")]
    ImageEncode(String),

    #[error("failed to write image {}: {source}", path.display())]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn transport(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: err.to_string(),
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Parse(_) => "parse",
            Self::ImageNotFound(_) => "image_not_found",
            Self::ImageEncode(_) => "image_encode",
            Self::ImageWrite { .. } => "image_write",
        }
    }
}
