//! Core types and traits for the courier HTTP client.
//!
//! This crate has no network code. It provides:
//! - [`Error`] and [`Result`] - the uniform failure value
//! - [`Context`] - cancellation scope carried by every request
//! - [`Codec`] and [`JsonCodec`] - pluggable body serialization
//! - [`RequestConfig`], [`RequestBuilder`] and [`Request`] - request assembly
//! - [`Response`] and [`Body`] - raw exchange results
//! - [`Decoder`] and [`ErrorDecoder`] - body decoding
//! - [`Transport`] - the seam a network implementation plugs into
//! - [`Executor`] - sends requests and classifies failures
//! - [`StatusCode`] - HTTP status codes (re-exported from `http` crate)
//! - [`header`] - HTTP header names (re-exported from `http` crate)

mod body;
mod codec;
mod context;
mod decode;
mod error;
mod executor;
pub mod prelude;
mod request;
mod request_id;
mod response;
mod transport;

pub use body::Body;
pub use codec::{Codec, JsonCodec};
pub use context::Context;
pub use decode::{Decoder, ErrorDecoder};
pub use error::{BoxError, Cause, ContextError, Error, Result};
pub use executor::Executor;
pub use request::{Headers, Request, RequestBuilder, RequestConfig};
pub use request_id::{ContextRequestId, REQUEST_ID_HEADER, RequestIdSource};
pub use response::Response;
pub use transport::{Transport, TransportError};

// Re-export http crate types for status codes and headers
pub use http::{Method, StatusCode, header};
