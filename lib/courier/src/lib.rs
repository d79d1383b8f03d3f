//! JSON-over-HTTP client with uniform error classification.
//!
//! Build requests from a shared configuration, send them through a pluggable
//! [`Transport`], and get every failure back as one [`Error`] type:
//! transport failures, timeouts and upstream `500`s are classified by the
//! [`Executor`], so callers only branch on status and message.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let client = Client::builder().with_logging().build();
//! let ctx = Context::background().with_request_id("req-42");
//!
//! let response = client.get(&ctx, "https://api.example.com/users/42").await?;
//! let user: User = Decoder.decode_response_body(Some(response)).await?;
//! ```
//!
//! Any [`Transport`] can replace [`HyperTransport`], which is how tests plug
//! in scripted transports:
//!
//! ```ignore
//! let client = Client::new(Executor::new(my_transport), RequestConfig::default());
//! ```

mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
mod transport;

// Re-export client and transport types
pub use client::{Client, ClientBuilder, merge_headers};
pub use config::{TransportConfig, TransportConfigBuilder};
pub use transport::{BoxedService, HyperTransport, HyperTransportBuilder, ServiceFuture};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use courier_core::{
    Body, BoxError, Cause, Codec, Context, ContextError, ContextRequestId, Decoder, Error,
    ErrorDecoder, Executor, Headers, JsonCodec, REQUEST_ID_HEADER, Request, RequestBuilder,
    RequestConfig, RequestIdSource, Response, Result, Transport, TransportError,
};

// Re-export http types for methods, status codes and headers
pub use courier_core::{Method, StatusCode, header};
