//! Core error types
//!
//! Errors surfaced by handle-constructing operations (open document, load
//! page, load text page). Queries degrade to neutral values and rendering
//! reports a `RenderOutcome` instead, so neither appears here.

use thiserror::Error;

use crate::engine::ErrorCode;

/// Error raised while opening documents or loading child handles
#[derive(Debug, Error)]
pub enum CoreError {
    /// The byte source reported zero length
    #[error("File is empty")]
    EmptySource,

    /// The byte source could not be inspected
    #[error("Cannot read document source: {0}")]
    SourceRead(#[from] std::io::Error),

    /// The engine rejected the password (or none was given)
    #[error("Password required or incorrect password.")]
    PasswordRequired,

    /// The engine could not parse the document
    #[error("cannot create document: {}", ErrorCode::Format.description())]
    Format,

    /// The document uses an encryption scheme the engine does not support
    #[error("cannot create document: {}", ErrorCode::Security.description())]
    UnsupportedSecurity,

    /// Any other engine-reported open failure
    #[error("cannot create document: {}", .0.description())]
    Engine(ErrorCode),

    /// The engine returned no page for the index
    #[error("cannot load page")]
    PageLoad { index: i32 },

    /// The engine returned no text page
    #[error("cannot load text page")]
    TextPageLoad,

    /// The handle does not refer to a live object
    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

/// Failure classes exposed to host runtimes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ResourceExhaustedOrEmptySource,
    PasswordRequired,
    FormatOrCorrupt,
    UnsupportedSecurity,
    PageLoadFailure,
    TextPageLoadFailure,
    UnknownEngineError,
    InvalidHandle,
}

impl CoreError {
    /// Classify an engine error code from a failed open
    pub fn from_open_failure(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Password => CoreError::PasswordRequired,
            ErrorCode::Format => CoreError::Format,
            ErrorCode::Security => CoreError::UnsupportedSecurity,
            other => CoreError::Engine(other),
        }
    }

    /// The taxonomy bucket for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::EmptySource | CoreError::SourceRead(_) => {
                ErrorKind::ResourceExhaustedOrEmptySource
            }
            CoreError::Engine(ErrorCode::File) => ErrorKind::ResourceExhaustedOrEmptySource,
            CoreError::PasswordRequired => ErrorKind::PasswordRequired,
            CoreError::Format => ErrorKind::FormatOrCorrupt,
            CoreError::UnsupportedSecurity => ErrorKind::UnsupportedSecurity,
            CoreError::Engine(_) => ErrorKind::UnknownEngineError,
            CoreError::PageLoad { .. } => ErrorKind::PageLoadFailure,
            CoreError::TextPageLoad => ErrorKind::TextPageLoadFailure,
            CoreError::InvalidHandle(_) => ErrorKind::InvalidHandle,
        }
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
