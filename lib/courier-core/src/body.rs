//! Single-use message bodies.
//!
//! A [`Body`] is an owned stream of bytes. Reading it consumes it, and dropping
//! it releases whatever it is attached to (a pooled connection, a socket, a
//! buffer), so a body is always released exactly once.

use std::fmt;

use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

use crate::error::BoxError;

/// Owned, single-use request or response body.
pub struct Body {
    inner: UnsyncBoxBody<Bytes, BoxError>,
}

impl Body {
    /// Wrap any [`http_body::Body`] yielding [`Bytes`].
    pub fn new<B>(body: B) -> Self
    where
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            inner: body.map_err(Into::into).boxed_unsync(),
        }
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Empty::<Bytes>::new())
    }

    /// Exact length, when known upfront.
    #[must_use]
    pub fn size_hint(&self) -> Option<u64> {
        http_body::Body::size_hint(&self.inner).exact()
    }

    /// Read the whole stream into memory.
    ///
    /// # Errors
    ///
    /// Returns the underlying stream error if reading any frame fails.
    pub async fn bytes(self) -> Result<Bytes, BoxError> {
        let collected = self.inner.collect().await?;
        Ok(collected.to_bytes())
    }

    /// Unwrap into the boxed [`http_body::Body`], for handing to a transport.
    #[must_use]
    pub fn into_inner(self) -> UnsyncBoxBody<Bytes, BoxError> {
        self.inner
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::new(Full::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::from(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::from(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("size_hint", &self.size_hint())
            .finish_non_exhaustive()
    }
}
