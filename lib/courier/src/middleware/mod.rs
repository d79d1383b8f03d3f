//! Tower middleware for courier transports.
//!
//! [`HyperTransport`](crate::HyperTransport) is a stack of tower services.
//! Layers added with [`HyperTransportBuilder::layer`](crate::HyperTransportBuilder::layer)
//! wrap the raw hyper exchange, first added = outermost.
//!
//! # Available Layers
//!
//! - [`LoggingLayer`] - Logs requests/responses using `tracing`
//!
//! Any tower layer over `Service<Request, Response = Response>` works as well,
//! for example `tower::limit::ConcurrencyLimitLayer`.
//!
//! # Adapter
//!
//! [`ServiceTransport`] turns any such service into a
//! [`Transport`](courier_core::Transport), so a hand-built tower stack can be
//! handed to an [`Executor`](courier_core::Executor) directly.
//!
//! # Example
//!
//! ```ignore
//! use courier::HyperTransport;
//! use courier::middleware::LoggingLayer;
//! use tower::limit::ConcurrencyLimitLayer;
//!
//! let transport = HyperTransport::builder()
//!     .layer(LoggingLayer::new())
//!     .layer(ConcurrencyLimitLayer::new(16))
//!     .build();
//! ```

mod logging;
mod service;

pub use logging::{LogLevel, Logging, LoggingLayer};
pub use service::ServiceTransport;

// Re-export tower building blocks for composition
pub use tower::{Layer, ServiceBuilder};
