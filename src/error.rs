//! Error types for slice rendering

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid orientation: {0:?}")]
    InvalidOrientation(String),

    #[error("Unknown colortable id: {0}")]
    UnknownColortable(u8),

    #[error("Malformed colortable entry on line {line}: {reason}")]
    ColortableParse { line: usize, reason: String },

    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    #[error("Invalid slice: {0}")]
    InvalidSlice(String),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a frame was skipped. These are reported through
/// [`FrameStatus`](crate::renderer::FrameStatus), never returned as errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotReady {
    #[error("no volume attached")]
    NoVolume,

    #[error("no loader attached")]
    NoLoader,

    #[error("loader has not completed")]
    LoaderPending,
}

pub type Result<T> = std::result::Result<T, RendererError>;
