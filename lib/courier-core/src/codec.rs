//! Body serialization.
//!
//! The [`Codec`] trait is what the request builder uses to turn a body value
//! into bytes. [`JsonCodec`] is the default implementation.

use bytes::Bytes;
use http::StatusCode;

use crate::{BoxError, Error, Result};

/// Pluggable body serializer/deserializer.
pub trait Codec: Send + Sync {
    /// Serialize a value into request body bytes.
    fn serialize<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<Bytes>;

    /// Deserialize body bytes into a value.
    fn deserialize<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for JsonCodec {
    fn serialize<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        serde_json::to_vec(value).map(Bytes::from).map_err(|err| {
            Error::new(StatusCode::INTERNAL_SERVER_ERROR, "error marshalling body").with_cause(err)
        })
    }

    fn deserialize<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        from_json(bytes).map_err(|err| {
            Error::new(StatusCode::INTERNAL_SERVER_ERROR, "error unmarshalling source")
                .with_cause(err)
        })
    }
}

/// Deserialize a single JSON document, keeping the path to the failing field.
///
/// A field error displays as `path: inner message`. Trailing non-whitespace
/// after the document is rejected.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
) -> std::result::Result<T, BoxError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

/// Deserialize the first JSON value of a stream; anything after it is left unread.
pub(crate) fn from_json_stream<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
) -> std::result::Result<T, BoxError> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    Ok(serde_path_to_error::deserialize(&mut deserializer)?)
}
