//! Centralized error types for mailsalvage.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the mailsalvage library.
#[derive(Error, Debug)]
pub enum SalvageError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// One of the export tables could not be read or decoded.
    #[error("Cannot load export table '{path}': {reason}")]
    Source { path: PathBuf, reason: String },

    /// A message references something the export does not contain.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A background `.eml` write failed or was cancelled.
    #[error("Failed to write '{path}': {reason}")]
    Write { path: PathBuf, reason: String },

    /// The configuration file is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// A message could not be turned into a complete internet message.
///
/// Whether this aborts the run or only skips the message depends on the
/// configured [`ResolutionPolicy`](crate::config::ResolutionPolicy).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// A `from`/`to`/`cc`/`bcc` entry points at a contact id that is not in the export.
    #[error("message {message}: unknown contact id {contact}")]
    UnknownContact { message: i64, contact: i64 },

    /// An `attachmentTypes` entry points at a MIME type id that is not in the export.
    #[error("message {message}: unknown MIME type id {mime_type}")]
    UnknownMimeType { message: i64, mime_type: i64 },

    /// A required attribute is absent from the decoded attribute blob.
    #[error("message {message}: attribute '{name}' is missing")]
    MissingAttribute { message: i64, name: String },

    /// An attribute holds something that is not a usable id.
    #[error("message {message}: attribute '{field}' has unusable value {value}")]
    InvalidReference {
        message: i64,
        field: String,
        value: String,
    },

    /// The attribute blob is not a JSON object.
    #[error("message {message}: malformed attribute blob: {reason}")]
    MalformedAttributes { message: i64, reason: String },

    /// The timestamp cannot be represented as a calendar date.
    #[error("message {message}: timestamp {micros} is out of range")]
    InvalidDate { message: i64, micros: i64 },
}

impl ResolutionError {
    /// The id of the message that failed to resolve.
    pub fn message_id(&self) -> i64 {
        match self {
            Self::UnknownContact { message, .. }
            | Self::UnknownMimeType { message, .. }
            | Self::MissingAttribute { message, .. }
            | Self::InvalidReference { message, .. }
            | Self::MalformedAttributes { message, .. }
            | Self::InvalidDate { message, .. } => *message,
        }
    }
}

/// Convenience alias for `Result<T, SalvageError>`.
pub type Result<T> = std::result::Result<T, SalvageError>;

impl SalvageError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
