//! Service-level error type.

use crate::db::DbError;
use derive_more::{Display, Error};
use gridguess_rules::{ErrorKind, LookupError, Rejection};
use tracing::instrument;

/// Error returned by the game service, classified by [`ErrorKind`].
#[derive(Debug, Clone, Display, Error)]
#[display("{kind}: {message} at {file}:{line}")]
pub struct GameError {
    /// Error category.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GameError {
    /// Creates a new error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self { kind, message: message.into(), line: loc.line(), file: loc.file() }
    }

    /// Malformed or incomplete request.
    #[track_caller]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, message)
    }

    /// Unknown game, session, user or entity.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Authorization or turn-ownership violation.
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Lost an optimistic-concurrency race.
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Entity data or setup provider could not be loaded.
    #[track_caller]
    pub fn upstream_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, message)
    }

    /// Persistence failure.
    #[track_caller]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Returns true if the caller should refresh state and resubmit.
    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
}

impl From<Rejection> for GameError {
    #[track_caller]
    fn from(rejection: Rejection) -> Self {
        Self::new(rejection.kind(), rejection.to_string())
    }
}

impl From<LookupError> for GameError {
    #[track_caller]
    fn from(err: LookupError) -> Self {
        Self::new(ErrorKind::UpstreamUnavailable, err.to_string())
    }
}

impl From<DbError> for GameError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        Self::storage(err.message)
    }
}

impl From<serde_json::Error> for GameError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_request(format!("Malformed JSON: {}", err))
    }
}
