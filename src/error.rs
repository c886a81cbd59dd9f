//! Error taxonomy for the inspection pipeline.
//!
//! Every module boundary inside the pipeline returns [`KhiError`]; the
//! demonstration CLI collapses these into `anyhow::Error` at its own edge.

use thiserror::Error;

/// The error taxonomy shared by every pipeline component.
#[derive(Error, Debug, Clone)]
pub enum KhiError {
    /// User-facing input problem: a set-filter that failed to parse, a
    /// validator that rejected a task input. Never terminates a run.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A lookup against a keyed registry (PatternFinder, TypedKeyMap) found
    /// nothing under the given key.
    #[error("not found: {0}")]
    NotFound(String),

    /// A registration attempted to insert a key that is already present.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The log backend rejected the request with HTTP 401.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The log backend rejected the request with HTTP 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The log backend reported HTTP 404 for the requested resource.
    #[error("not found upstream: {0}")]
    UpstreamNotFound(String),

    /// Any other transport-level failure talking to the log backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// A typed accessor (FieldSet, TypedKeyMap value) observed the wrong
    /// dynamic type. Always a programming bug, never a user error.
    #[error("type conversion failed: {0}")]
    TypeConversionFailed(String),

    /// Planning found a dependency cycle, a missing dependency, or other
    /// misuse of the typed task API. Aborts the whole run.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl KhiError {
    /// Classifies an HTTP status code the way the log client boundary must.
    pub fn from_http_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => KhiError::Unauthorized(message),
            403 => KhiError::Forbidden(message),
            404 => KhiError::UpstreamNotFound(message),
            _ => KhiError::Transport(message),
        }
    }

    /// True for errors that must abort the entire run rather than just the
    /// task or group that raised them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, KhiError::Fatal(_) | KhiError::TypeConversionFailed(_))
    }
}

pub type KhiResult<T> = Result<T, KhiError>;
