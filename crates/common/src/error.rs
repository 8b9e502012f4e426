//! Error types shared across Flyover crates.

use std::fmt;
use std::path::PathBuf;

/// External collaborator that failed during a render run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collaborator {
    MapSurface,
    FrameCapture,
    Encoder,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::MapSurface => "map surface",
            Collaborator::FrameCapture => "frame capture",
            Collaborator::Encoder => "encoder",
        };
        f.write_str(name)
    }
}

/// Top-level error type for Flyover operations.
#[derive(Debug, thiserror::Error)]
pub enum FlyoverError {
    /// Malformed or empty route input. Raised before any rendering starts.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// A map, capture, or encoder failure. Fatal for the current run.
    #[error("{collaborator} error: {message}")]
    Collaborator {
        collaborator: Collaborator,
        message: String,
    },

    /// The user cancelled the run. Not a failure.
    #[error("Cancelled by user")]
    CancelledByUser,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using FlyoverError.
pub type FlyoverResult<T> = Result<T, FlyoverError>;

impl FlyoverError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn map_surface(msg: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::MapSurface,
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::FrameCapture,
            message: msg.into(),
        }
    }

    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Collaborator {
            collaborator: Collaborator::Encoder,
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error came from an external collaborator.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. })
    }

    /// Whether this error represents a deliberate user cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::CancelledByUser)
    }

    /// Short message suitable for showing to the person who started the run.
    pub fn user_message(&self) -> String {
        match self {
            Self::Parse { message } => format!("The route could not be read: {message}"),
            Self::Collaborator {
                collaborator,
                message,
            } => format!("Rendering stopped because the {collaborator} failed: {message}"),
            Self::CancelledByUser => "Rendering was cancelled.".to_string(),
            Self::Config { message } => format!("Invalid render settings: {message}"),
            Self::FileNotFound { path } => format!("File not found: {}", path.display()),
            other => format!("Rendering failed: {other}"),
        }
    }
}
