//! HTTP transport implementation using hyper-util.

use std::error::Error as StdError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use bytes::Bytes;
use courier_core::{Body, BoxError, Context, ContextError, Transport, TransportError};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::combinators::UnsyncBoxBody;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use crate::config::{TransportConfig, TransportConfigBuilder};
use crate::connector::https_connector;
use crate::middleware::{LoggingLayer, ServiceTransport};
use crate::{Request, Response};

// ============================================================================
// Type-Erased Service for Middleware Composition
// ============================================================================

/// Type-erased service for middleware composition.
pub type BoxedService = BoxCloneService<Request, Response, TransportError>;

/// Future returned by the raw hyper service.
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response, TransportError>> + Send + 'static>>;

type HyperBody = UnsyncBoxBody<Bytes, BoxError>;

// ============================================================================
// Raw Transport (internal, direct hyper access)
// ============================================================================

#[derive(Clone)]
struct RawHyperTransport {
    inner: Client<HttpsConnector<HttpConnector>, HyperBody>,
    timeout: Duration,
}

impl RawHyperTransport {
    fn new(config: &TransportConfig) -> Self {
        let connector = https_connector(config.connect_timeout);
        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            inner,
            timeout: config.timeout,
        }
    }

    fn build_hyper_request(request: Request) -> Result<http::Request<HyperBody>, TransportError> {
        let (method, uri, headers, body, _context) = request.into_parts();

        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(TransportError::InvalidRequest(format!(
                "absolute URI required, got '{uri}'"
            )));
        }

        let mut http_request = http::Request::new(body.unwrap_or_default().into_inner());
        *http_request.method_mut() = method;
        *http_request.uri_mut() = uri;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let ctx = request.context().with_timeout(self.timeout);
        let hyper_request = Self::build_hyper_request(request)?;

        let response = ctx
            .run(self.inner.request(hyper_request))
            .await?
            .map_err(map_hyper_error)?;

        let (parts, body) = response.into_parts();
        let body = Body::new(ContextBody::new(Body::new(body).into_inner(), ctx));

        Ok(Response::new(parts.status.as_u16(), parts.headers, body))
    }
}

impl Service<Request> for RawHyperTransport {
    type Response = Response;
    type Error = TransportError;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), TransportError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

#[allow(clippy::needless_pass_by_value)]
fn map_hyper_error(err: hyper_util::client::legacy::Error) -> TransportError {
    let msg = error_chain(&err);

    if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
        return TransportError::Tls(msg);
    }

    TransportError::Connection(msg)
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    std::iter::successors(Some(err), |err| (*err).source())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

// ============================================================================
// Context-bound response body
// ============================================================================

/// Response body that fails once the request context is done.
///
/// Keeps cancellation and the transport timeout in force while the caller
/// reads the body, not only until the headers arrive.
struct ContextBody {
    inner: HyperBody,
    done: Pin<Box<dyn Future<Output = ContextError> + Send>>,
}

impl ContextBody {
    fn new(inner: HyperBody, ctx: Context) -> Self {
        Self {
            inner,
            done: Box::pin(async move { ctx.done().await }),
        }
    }
}

impl HttpBody for ContextBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = self.get_mut();

        if let Poll::Ready(err) = this.done.as_mut().poll(cx) {
            return Poll::Ready(Some(Err(Box::new(TransportError::Context(err)))));
        }

        Pin::new(&mut this.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

// ============================================================================
// Public Transport
// ============================================================================

/// Production [`Transport`] using hyper-util with connection pooling, TLS,
/// and tower middleware support.
///
/// # Example
///
/// ```ignore
/// use courier::HyperTransport;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(5))
///     .with_logging()
///     .build();
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: ServiceTransport<BoxedService>,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransportConfig::default())
    }

    /// Create a new transport with custom configuration (no middleware).
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        let raw = RawHyperTransport::new(&config);
        Self::with_service(BoxCloneService::new(raw), config)
    }

    fn with_service(service: BoxedService, config: TransportConfig) -> Self {
        Self {
            service: ServiceTransport::new(service),
            config,
        }
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    type Error = TransportError;

    fn send(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        self.service.send(request)
    }
}

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use courier::HyperTransport;
/// use courier::middleware::LoggingLayer;
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(30))
///     .layer(LoggingLayer::debug())
///     .build();
/// ```
#[derive(Default, Clone)]
pub struct HyperTransportBuilder {
    config: TransportConfigBuilder,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Add a Tower layer to the transport.
    ///
    /// Layers are applied in order: first added = outermost (processes requests first).
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = TransportError>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<Request>>::Future: Send,
    {
        self.layers
            .push(Arc::new(move |service| BoxCloneService::new(layer.layer(service))));
        self
    }

    /// Add request/response logging.
    #[must_use]
    pub fn with_logging(self) -> Self {
        self.layer(LoggingLayer::new())
    }

    /// Add debug-level logging (includes headers).
    #[must_use]
    pub fn with_debug_logging(self) -> Self {
        self.layer(LoggingLayer::debug())
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the transport with all configured middleware.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let config = self.config.build();
        let raw = RawHyperTransport::new(&config);

        // Innermost first, so the first layer added ends up outermost
        let service = self
            .layers
            .iter()
            .rev()
            .fold(BoxCloneService::new(raw), |service, layer_fn| layer_fn(service));

        HyperTransport::with_service(service, config)
    }
}

#[cfg(test)]
mod tests {
    use http::{HeaderMap, Method, Uri};

    use super::*;

    fn request(uri: &'static str, body: Option<Body>) -> Request {
        Request::from_parts(
            Method::POST,
            Uri::from_static(uri),
            HeaderMap::new(),
            body,
            Context::background(),
        )
    }

    #[test]
    fn transport_default() {
        let transport = HyperTransport::new();
        assert_eq!(transport.config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn transport_builder() {
        let transport = HyperTransport::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(2))
            .with_logging()
            .build();

        assert_eq!(transport.config().timeout, Duration::from_secs(60));
        assert_eq!(transport.config().connect_timeout, Duration::from_secs(2));
    }

    #[test]
    fn builder_counts_layers() {
        let builder = HyperTransport::builder().with_logging().with_debug_logging();
        assert!(format!("{builder:?}").contains("layers_count: 2"));
    }

    #[test]
    fn relative_uri_is_rejected() {
        let result = RawHyperTransport::build_hyper_request(request("/users", None));
        assert!(matches!(result, Err(TransportError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn hyper_request_keeps_parts() {
        let mut request = request("http://upstream.test/users", Some(Body::from("{}")));
        request.set_header("x-trace", "t-1").expect("header");

        let hyper_request = RawHyperTransport::build_hyper_request(request).expect("request");

        assert_eq!(hyper_request.method(), &Method::POST);
        assert_eq!(hyper_request.uri().path(), "/users");
        assert_eq!(hyper_request.headers()["x-trace"], "t-1");
        assert_eq!(hyper_request.body().size_hint().exact(), Some(2));
    }

    #[test]
    fn error_chain_joins_every_source() {
        let err = TransportError::Context(ContextError::Canceled);
        assert_eq!(error_chain(&err), "transport interrupted: context canceled");
    }

    /// Body that never yields a frame.
    struct Stalled;

    impl HttpBody for Stalled {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<Option<Result<Frame<Bytes>, std::io::Error>>> {
            Poll::Pending
        }
    }

    #[tokio::test(start_paused = true)]
    async fn body_fails_after_context_is_done() {
        let ctx = Context::background().with_timeout(Duration::from_millis(10));
        let body = Body::new(ContextBody::new(Body::new(Stalled).into_inner(), ctx));

        let err = body.bytes().await.expect_err("should fail");

        let transport = err.downcast_ref::<TransportError>().expect("transport error");
        assert!(matches!(
            transport,
            TransportError::Context(ContextError::DeadlineExceeded)
        ));
    }
}
