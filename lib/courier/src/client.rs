//! High-level client facade.
//!
//! [`Client`] builds one request per call from its [`RequestConfig`] and hands
//! it to an [`Executor`]. It never decodes successful responses; use
//! [`Decoder`] on the returned [`Response`].

use std::time::Duration;

use courier_core::{
    Codec, Context, Decoder, ErrorDecoder, Executor, Headers, JsonCodec, RequestBuilder,
    RequestConfig, RequestIdSource, Transport,
};
use http::Method;
use serde::Serialize;
use tower::Layer;
use tower_service::Service;

use crate::transport::{BoxedService, HyperTransportBuilder};
use crate::{HyperTransport, Request, Response, Result, TransportError};

/// Merge header mappings left to right; later mappings win.
///
/// Names are compared case-insensitively and returned lower-cased.
#[must_use]
pub fn merge_headers(headers: &[Headers]) -> Headers {
    headers
        .iter()
        .flatten()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
        .collect()
}

/// JSON HTTP client.
///
/// # Example
///
/// ```ignore
/// use courier::{Client, Context, Decoder};
///
/// let client = Client::builder()
///     .default_header("accept", "application/json")
///     .build();
///
/// let response = client.get(&Context::background(), "https://api.example.com/users/1").await?;
/// let user: User = Decoder.decode_response_body(Some(response)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Client<T = HyperTransport, D = Decoder, C = JsonCodec> {
    executor: Executor<T, D>,
    config: RequestConfig<C>,
}

impl Client {
    /// Create a new client builder wired to [`HyperTransport`].
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<T, D, C> Client<T, D, C>
where
    T: Transport,
    D: ErrorDecoder,
    C: Codec,
{
    /// Client executing with `executor` and building from `config`.
    #[must_use]
    pub const fn new(executor: Executor<T, D>, config: RequestConfig<C>) -> Self {
        Self { executor, config }
    }

    /// Request configuration every builder starts from.
    #[must_use]
    pub const fn config(&self) -> &RequestConfig<C> {
        &self.config
    }

    /// Underlying executor.
    #[must_use]
    pub const fn executor(&self) -> &Executor<T, D> {
        &self.executor
    }

    /// Fresh builder scoped to `ctx`, seeded with the default headers.
    #[must_use]
    pub fn request_builder(&self, ctx: Context) -> RequestBuilder<'_, C> {
        RequestBuilder::new(ctx, &self.config)
    }

    /// Execute an already built request.
    ///
    /// # Errors
    ///
    /// Returns the executor's classification of the failure.
    pub async fn execute_request(&self, request: Request) -> Result<Response> {
        self.executor.execute(request).await
    }

    /// `GET endpoint`.
    ///
    /// # Errors
    ///
    /// Returns a build error without calling the transport, or the executor's error.
    pub async fn get(&self, ctx: &Context, endpoint: &str) -> Result<Response> {
        let builder = self
            .request_builder(ctx.clone())
            .with_endpoint(endpoint)
            .with_method(Method::GET);

        self.send(builder).await
    }

    /// `POST endpoint` with an optional JSON body and extra headers.
    ///
    /// # Errors
    ///
    /// Returns a build error without calling the transport, or the executor's error.
    pub async fn post<B>(
        &self,
        ctx: &Context,
        endpoint: &str,
        body: Option<&B>,
        headers: &[Headers],
    ) -> Result<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send_with_body(ctx, Method::POST, endpoint, body, headers)
            .await
    }

    /// `PUT endpoint` with an optional JSON body and extra headers.
    ///
    /// # Errors
    ///
    /// Returns a build error without calling the transport, or the executor's error.
    pub async fn put<B>(
        &self,
        ctx: &Context,
        endpoint: &str,
        body: Option<&B>,
        headers: &[Headers],
    ) -> Result<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send_with_body(ctx, Method::PUT, endpoint, body, headers)
            .await
    }

    /// `PATCH endpoint` with an optional JSON body and extra headers.
    ///
    /// # Errors
    ///
    /// Returns a build error without calling the transport, or the executor's error.
    pub async fn patch<B>(
        &self,
        ctx: &Context,
        endpoint: &str,
        body: Option<&B>,
        headers: &[Headers],
    ) -> Result<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        self.send_with_body(ctx, Method::PATCH, endpoint, body, headers)
            .await
    }

    async fn send_with_body<B>(
        &self,
        ctx: &Context,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
        headers: &[Headers],
    ) -> Result<Response>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut builder = self
            .request_builder(ctx.clone())
            .with_endpoint(endpoint)
            .with_method(method)
            .with_headers(merge_headers(headers));

        if let Some(body) = body {
            builder = builder.with_body(body);
        }

        self.send(builder).await
    }

    async fn send(&self, builder: RequestBuilder<'_, C>) -> Result<Response> {
        let request = builder.build()?;
        self.execute_request(request).await
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for a [`Client`] over [`HyperTransport`], the JSON [`Decoder`]
/// and [`JsonCodec`].
///
/// # Example
///
/// ```ignore
/// use courier::Client;
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .timeout(Duration::from_secs(5))
///     .default_header("user-agent", "billing/1.4")
///     .with_logging()
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ClientBuilder {
    transport: HyperTransportBuilder,
    config: RequestConfig,
}

impl ClientBuilder {
    /// Set the transport request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.timeout(timeout);
        self
    }

    /// Set the transport connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.connect_timeout(timeout);
        self
    }

    /// Add a header sent with every request unless a call overrides it.
    #[must_use]
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.config = self.config.default_header(name, value);
        self
    }

    /// Add several default headers.
    #[must_use]
    pub fn default_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        self.config = self.config.default_headers(headers);
        self
    }

    /// Replace the source of the `x-request-id` header.
    #[must_use]
    pub fn request_id_source(mut self, source: impl RequestIdSource + 'static) -> Self {
        self.config = self.config.request_id_source(source);
        self
    }

    /// Add a Tower layer around the transport.
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
        self.transport = self.transport.layer(layer);
        self
    }

    /// Add request/response logging around the transport.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.transport = self.transport.with_logging();
        self
    }

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        Client::new(Executor::new(self.transport.build()), self.config)
    }
}
