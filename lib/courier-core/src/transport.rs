//! Transport seam.
//!
//! A [`Transport`] performs one HTTP exchange and nothing else: no status
//! classification, no decoding. The [`Executor`](crate::Executor) wraps a
//! transport and turns its raw outcome into courier [`Error`](crate::Error)s.
//!
//! Implement [`Transport`] directly for tests or custom stacks; the `courier`
//! crate ships a hyper-based one.

use std::future::Future;
use std::sync::Arc;

use derive_more::{Display, Error};

use crate::{ContextError, Request, Response};

/// Performs a single HTTP exchange.
///
/// Implementations must watch the request [`Context`](crate::Context) and
/// return an error whose source chain contains a [`ContextError`] when the
/// call is cut short by it. They must not retry.
pub trait Transport: Send + Sync {
    /// Failure raised by the transport.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send `request` and return the raw response, whatever its status.
    fn send(&self, request: Request) -> impl Future<Output = Result<Response, Self::Error>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    type Error = T::Error;

    fn send(&self, request: Request) -> impl Future<Output = Result<Response, Self::Error>> + Send {
        T::send(self, request)
    }
}

impl<T: Transport> Transport for &T {
    type Error = T::Error;

    fn send(&self, request: Request) -> impl Future<Output = Result<Response, Self::Error>> + Send {
        T::send(self, request)
    }
}

/// Failure of a transport-level exchange.
#[derive(Debug, Display, Error)]
pub enum TransportError {
    /// The request context finished first.
    #[display("transport interrupted")]
    Context(ContextError),

    /// Connecting, writing or reading failed.
    #[display("connection error: {_0}")]
    Connection(#[error(not(source))] String),

    /// TLS setup or handshake failed.
    #[display("tls error: {_0}")]
    Tls(#[error(not(source))] String),

    /// The request could not be put on the wire.
    #[display("invalid request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
}

impl From<ContextError> for TransportError {
    fn from(err: ContextError) -> Self {
        Self::Context(err)
    }
}
