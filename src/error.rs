//! Unified error type for blueprint3d.

use thiserror::Error;

/// Errors that can occur anywhere in the upload-to-generation pipeline.
#[derive(Debug, Error)]
pub enum BlueprintError {
    /// The generation backend reported a failure. `message` is user-facing.
    #[error("{message}")]
    Api {
        /// HTTP status code returned through the relay.
        status: u16,
        /// Backend `detail`, or a generic message when none was supplied.
        message: String,
    },

    /// A network error occurred.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The selected file is neither an image nor a PDF.
    #[error("Unsupported file type '{mime_type}'. Upload an image (JPG, PNG, ...) or a PDF.")]
    UnsupportedType {
        /// The resolved MIME type of the rejected file.
        mime_type: String,
    },

    /// The selected file exceeds the upload cap.
    #[error("File is too large ({size} bytes). Maximum allowed is {limit} bytes.")]
    TooLarge {
        /// Size of the rejected file in bytes.
        size: usize,
        /// Configured cap in bytes.
        limit: usize,
    },

    /// The selected file has no content.
    #[error("File '{0}' is empty")]
    EmptyFile(String),

    /// `generate` was called before any blueprint was selected.
    #[error("No blueprint image selected")]
    NoImage,

    /// A newer generate call started before this one resolved.
    #[error("Superseded by a newer generation request")]
    Superseded,

    /// Fetching or saving the generated image failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The relay server could not start or stopped unexpectedly.
    #[error("Server error: {0}")]
    Server(String),
}
