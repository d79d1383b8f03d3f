//! Error types for courier.
//!
//! [`Error`] is the single failure value returned by every courier operation.
//! It is also the JSON shape downstream services use for their own error
//! bodies, so the same struct is decoded from a failed response by
//! [`Decoder::decode_error_body`](crate::Decoder::decode_error_body).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use derive_more::{Display, Error as DeriveError};
use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Boxed error used for causes and body stream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared handle to the underlying cause of an [`Error`].
pub type Cause = Arc<dyn std::error::Error + Send + Sync>;

// ============================================================================
// Context Errors
// ============================================================================

/// Reason a [`Context`](crate::Context) is done.
///
/// Transports surface this (directly or as a source) when a call was cut short
/// by its context; the executor reports such failures as timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, DeriveError)]
pub enum ContextError {
    /// The context was canceled.
    #[display("context canceled")]
    Canceled,
    /// The context deadline passed.
    #[display("context deadline exceeded")]
    DeadlineExceeded,
}

// ============================================================================
// Error Type
// ============================================================================

/// Uniform error returned by courier.
///
/// Carries an HTTP-like status, a message, an optional cause and the time the
/// failure was detected. Serializes as `{"status", "message", "time"}`; the
/// cause never leaves the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Error {
    #[serde(default)]
    status: u16,
    #[serde(default)]
    message: String,
    #[serde(skip)]
    cause: Option<Cause>,
    #[serde(default, deserialize_with = "nullable_time")]
    time: DateTime<Utc>,
}

/// `null` and a missing field both read as the Unix epoch.
fn nullable_time<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<DateTime<Utc>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with the given status and message, stamped with the current time.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            cause: None,
            time: Utc::now(),
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Status classification. `0` means the status was never set.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Status as a typed [`StatusCode`], if it is a valid one.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u16(self.status).ok()
    }

    /// Error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Underlying cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// When the failure was detected (Unix epoch if a decoded body omitted it).
    #[must_use]
    pub const fn time(&self) -> DateTime<Utc> {
        self.time
    }

    /// Fill in the status from `status` when it was left unset.
    pub(crate) fn backfill_status(&mut self, status: u16) {
        if self.status == 0 {
            self.status = status;
        }
    }

    /// Returns `true` if this is a timeout (504) error.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.status == StatusCode::GATEWAY_TIMEOUT.as_u16()
    }

    /// Returns `true` if a dependency answered with a server error (424).
    #[must_use]
    pub fn is_dependency_failure(&self) -> bool {
        self.status == StatusCode::FAILED_DEPENDENCY.as_u16()
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.cause {
            Some(cause) => write!(
                f,
                "status: {} message: {} error: {cause} time: {}",
                self.status, self.message, self.time
            ),
            None => write!(f, "status: {} message: {}", self.status, self.message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
