//! The remote tracker capability the engine drives.

use crate::error::ErrorCode;
use crate::model::{ChildItemSpec, ParentItemSpec, RemoteId};
use std::fmt;

/// Longest response body kept for diagnostics.
pub const MAX_BODY_CHARS: usize = 200;

/// A creation call that did not yield a new remote item.
///
/// `status` is `None` when the request never produced an HTTP response
/// (connection refused, DNS failure, timeout).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCreationError {
    pub status: Option<u16>,
    pub body: String,
}

impl fmt::Display for RemoteCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) if self.body.is_empty() => write!(f, "HTTP {status}"),
            Some(status) => write!(f, "HTTP {status}: {}", self.body),
            None => write!(f, "transport error: {}", self.body),
        }
    }
}

impl std::error::Error for RemoteCreationError {}

impl RemoteCreationError {
    /// Failure carrying an HTTP status; the body is truncated for display.
    #[must_use]
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            body: truncate_body(body),
        }
    }

    /// Failure that never reached an HTTP response.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: message.into(),
        }
    }

    /// True for responses that signal the caller is going too fast.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self.status, Some(429 | 503))
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        if self.is_rate_limited() {
            return ErrorCode::RateLimited;
        }
        match self.status {
            None => ErrorCode::TransportFailed,
            Some(_) => ErrorCode::RemoteRejected,
        }
    }
}

/// Trim a response body to [`MAX_BODY_CHARS`] characters.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Creates items in the remote tracker, one blocking call at a time.
pub trait RemoteIssueClient {
    /// Create a parent item.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteCreationError`] for any non-success response or
    /// transport failure.
    fn create_parent(&mut self, spec: &ParentItemSpec) -> Result<RemoteId, RemoteCreationError>;

    /// Create a child item linked to an already created parent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteCreationError`] for any non-success response or
    /// transport failure.
    fn create_child(
        &mut self,
        spec: &ChildItemSpec,
        parent: &RemoteId,
    ) -> Result<RemoteId, RemoteCreationError>;
}

impl<C: RemoteIssueClient + ?Sized> RemoteIssueClient for &mut C {
    fn create_parent(&mut self, spec: &ParentItemSpec) -> Result<RemoteId, RemoteCreationError> {
        (**self).create_parent(spec)
    }

    fn create_child(
        &mut self,
        spec: &ChildItemSpec,
        parent: &RemoteId,
    ) -> Result<RemoteId, RemoteCreationError> {
        (**self).create_child(spec, parent)
    }
}
