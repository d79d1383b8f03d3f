//! Cancellation scopes.
//!
//! A [`Context`] travels from the caller into the request builder and from
//! there into the built [`Request`](crate::Request). Transports watch it and
//! give up when it is canceled or its deadline passes.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use courier_core::Context;
//!
//! let ctx = Context::background()
//!     .with_request_id("req-42")
//!     .with_timeout(Duration::from_secs(5));
//!
//! assert_eq!(ctx.request_id(), Some("req-42"));
//! assert!(ctx.deadline().is_some());
//! assert!(ctx.err().is_none());
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::ContextError;

/// Cancellation/deadline-bearing scope for one or more calls.
///
/// Cloning is cheap; clones share the same cancellation state.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    request_id: Option<Arc<str>>,
}

impl Context {
    /// A context that is never done unless explicitly canceled.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Child context that can be canceled without affecting `self`.
    ///
    /// Canceling `self` still cancels the child.
    #[must_use]
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            request_id: self.request_id.clone(),
        }
    }

    /// Child context that is done at `deadline` at the latest.
    ///
    /// An earlier deadline inherited from `self` is kept.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = self
            .deadline
            .map_or(deadline, |current| current.min(deadline));

        Self {
            deadline: Some(deadline),
            ..self.with_cancel()
        }
    }

    /// Child context that is done after `timeout` at the latest.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Same scope, carrying `request_id` as the upstream correlation identifier.
    #[must_use]
    pub fn with_request_id(&self, request_id: impl Into<Arc<str>>) -> Self {
        Self {
            request_id: Some(request_id.into()),
            ..self.clone()
        }
    }

    /// Cancel this scope and every child derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Upstream correlation identifier, if one was set.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Why the context is done, or `None` while it is still live.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Wait until the context is done.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => ContextError::Canceled,
                () = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Drive `future` unless the context is done first.
    ///
    /// # Errors
    ///
    /// Returns the [`ContextError`] if the context finishes before `future`.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            output = future => Ok(output),
            err = self.done() => Err(err),
        }
    }
}
