//! HTTP request building.
//!
//! A [`RequestBuilder`] accumulates endpoint, method, headers and body, then
//! [`build`](RequestBuilder::build)s an executable [`Request`]. Builders are
//! created per call from a shared [`RequestConfig`] that holds the codec, the
//! default headers and the request-id source.
//!
//! # Example
//!
//! ```
//! use courier_core::{Context, RequestBuilder, RequestConfig};
//!
//! let config = RequestConfig::default().default_header("Accept", "application/json");
//!
//! let request = RequestBuilder::new(Context::background(), &config)
//!     .with_method("POST")
//!     .with_endpoint("https://api.example.com/users")
//!     .with_body(serde_json::json!({"name": "Alice"}))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.method(), "POST");
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};

use crate::{
    Body, Codec, Context, ContextRequestId, Error, JsonCodec, REQUEST_ID_HEADER, RequestIdSource,
    Result,
};

/// Header mapping used by builders and the client facade.
///
/// Keys are stored lower-cased so that later writes replace earlier ones
/// regardless of casing.
pub type Headers = HashMap<String, String>;

// ============================================================================
// Request
// ============================================================================

/// A fully materialized request, ready to hand to a transport.
#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Option<Body>,
    context: Context,
}

impl Request {
    /// Construct a request from raw method and URI strings.
    ///
    /// An empty method means `GET`.
    ///
    /// # Errors
    ///
    /// Returns an error if the method is not a valid token or the URI cannot be parsed.
    pub fn new(
        context: Context,
        method: &str,
        uri: &str,
        body: Body,
    ) -> std::result::Result<Self, http::Error> {
        let method = if method.is_empty() {
            Method::GET
        } else {
            Method::from_bytes(method.as_bytes())?
        };
        let uri = Uri::try_from(uri)?;

        Ok(Self {
            method,
            uri,
            headers: HeaderMap::new(),
            body: Some(body),
            context,
        })
    }

    /// Reassemble a request from its parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Option<Body>,
        context: Context,
    ) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            context,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI.
    #[must_use]
    pub const fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, if it is valid text.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Set a header, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or value is not valid for HTTP.
    pub fn set_header(&mut self, name: &str, value: &str) -> std::result::Result<(), http::Error> {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        let value = HeaderValue::from_str(value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Request body, unless it was already taken.
    #[must_use]
    pub const fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Take ownership of the body.
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Cancellation scope the request runs in.
    #[must_use]
    pub const fn context(&self) -> &Context {
        &self.context
    }

    /// Consume into (method, uri, headers, body, context).
    #[must_use]
    pub fn into_parts(self) -> (Method, Uri, HeaderMap, Option<Body>, Context) {
        (self.method, self.uri, self.headers, self.body, self.context)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Shared configuration every [`RequestBuilder`] is seeded from.
pub struct RequestConfig<C = JsonCodec> {
    codec: C,
    default_headers: Headers,
    request_id: Arc<dyn RequestIdSource>,
}

impl<C> RequestConfig<C> {
    /// Configuration using `codec`, no default headers, and [`ContextRequestId`].
    #[must_use]
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            default_headers: Headers::new(),
            request_id: Arc::new(ContextRequestId),
        }
    }

    /// Add a header sent with every request unless overridden.
    #[must_use]
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        insert_header(&mut self.default_headers, name.as_ref(), value.into());
        self
    }

    /// Add several default headers.
    #[must_use]
    pub fn default_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            insert_header(&mut self.default_headers, name.as_ref(), value.into());
        }
        self
    }

    /// Replace the source of the `x-request-id` header.
    #[must_use]
    pub fn request_id_source(mut self, source: impl RequestIdSource + 'static) -> Self {
        self.request_id = Arc::new(source);
        self
    }

    /// Body codec.
    #[must_use]
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Default headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.default_headers
    }
}

impl Default for RequestConfig<JsonCodec> {
    fn default() -> Self {
        Self::new(JsonCodec)
    }
}

impl<C: Clone> Clone for RequestConfig<C> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            default_headers: self.default_headers.clone(),
            request_id: Arc::clone(&self.request_id),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for RequestConfig<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("codec", &self.codec)
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

fn insert_header(headers: &mut Headers, name: &str, value: String) {
    headers.insert(name.to_ascii_lowercase(), value);
}

// ============================================================================
// Builder
// ============================================================================

type SerializeBody<'a, C> = Box<dyn FnOnce(&C) -> Result<Bytes> + Send + 'a>;

/// Fluent builder for one [`Request`].
///
/// Serialization is deferred to [`build`](Self::build), which consumes the builder.
pub struct RequestBuilder<'a, C = JsonCodec> {
    context: Context,
    config: &'a RequestConfig<C>,
    endpoint: String,
    method: String,
    headers: Headers,
    body: Option<SerializeBody<'a, C>>,
}

impl<'a, C: Codec> RequestBuilder<'a, C> {
    /// New builder scoped to `context`, seeded with the config's default headers.
    #[must_use]
    pub fn new(context: Context, config: &'a RequestConfig<C>) -> Self {
        Self {
            context,
            config,
            endpoint: String::new(),
            method: String::new(),
            headers: config.default_headers.clone(),
            body: None,
        }
    }

    /// Set the endpoint (absolute URL or path).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the HTTP method.
    #[must_use]
    pub fn with_method(mut self, method: impl AsRef<str>) -> Self {
        method.as_ref().clone_into(&mut self.method);
        self
    }

    /// Merge headers; a later value for the same name replaces the earlier one.
    #[must_use]
    pub fn with_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            insert_header(&mut self.headers, name.as_ref(), value.into());
        }
        self
    }

    /// Set the body, serialized with the configured codec at build time.
    #[must_use]
    pub fn with_body<T>(mut self, body: T) -> Self
    where
        T: serde::Serialize + Send + 'a,
    {
        self.body = Some(Box::new(move |codec: &C| codec.serialize(&body)));
        self
    }

    /// Configured endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Configured method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Headers accumulated so far.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether a body was set.
    #[must_use]
    pub const fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Build the request.
    ///
    /// # Errors
    ///
    /// - the codec's own error, unchanged, if the body fails to serialize
    /// - `500 error creating request` if the method, URI or a header is invalid
    pub fn build(self) -> Result<Request> {
        let Self {
            context,
            config,
            endpoint,
            method,
            headers,
            body,
        } = self;

        let body = match body {
            Some(serialize) => Body::from(serialize(&config.codec)?),
            None => Body::empty(),
        };

        Request::new(context, &method, &endpoint, body)
            .and_then(|mut request| {
                for (name, value) in &headers {
                    request.set_header(name, value)?;
                }
                let request_id = config.request_id.request_id(request.context());
                request.set_header(REQUEST_ID_HEADER, &request_id)?;
                Ok(request)
            })
            .map_err(|err| {
                Error::new(StatusCode::INTERNAL_SERVER_ERROR, "error creating request")
                    .with_cause(err)
            })
    }
}

impl<C> fmt::Debug for RequestBuilder<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("endpoint", &self.endpoint)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};

    use super::*;

    /// Codec that always fails, counting calls.
    #[derive(Debug, Default)]
    struct FailingCodec {
        calls: AtomicUsize,
    }

    impl Codec for FailingCodec {
        fn serialize<T: serde::Serialize + ?Sized>(&self, _value: &T) -> Result<Bytes> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::new(StatusCode::INTERNAL_SERVER_ERROR, "Marshaller error"))
        }

        fn deserialize<T: serde::de::DeserializeOwned>(&self, _bytes: &[u8]) -> Result<T> {
            Err(Error::new(StatusCode::INTERNAL_SERVER_ERROR, "Marshaller error"))
        }
    }

    struct FixedId(&'static str);

    impl RequestIdSource for FixedId {
        fn request_id(&self, _context: &Context) -> String {
            self.0.to_string()
        }
    }

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn with_endpoint_and_method() {
        let config = RequestConfig::default();
        let builder = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test")
            .with_method(Method::POST);

        assert_eq!(builder.endpoint(), "/test");
        assert_eq!(builder.method(), "POST");
        assert!(!builder.has_body());
    }

    #[test]
    fn with_headers_overlays_previous_calls() {
        let config = RequestConfig::default()
            .default_header("test", "test")
            .default_header("content-type", "application/json");

        let builder = RequestBuilder::new(Context::background(), &config)
            .with_headers(headers(&[("abc", "header-one"), ("Content-Type", "ninjas")]))
            .with_headers(headers(&[("abc", "header-three"), ("new-header", "the-new-header")]));

        let result = builder.headers();
        assert_eq!(result.len(), 4);
        assert_eq!(result["test"], "test");
        assert_eq!(result["content-type"], "ninjas");
        assert_eq!(result["abc"], "header-three");
        assert_eq!(result["new-header"], "the-new-header");
    }

    #[test]
    fn build_with_body_and_headers() {
        let config = RequestConfig::default().default_header("test", "test");

        let mut request = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("http://rain.us/test")
            .with_method("POST")
            .with_body(serde_json::json!({"test": "test"}))
            .build()
            .expect("build");

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.uri().to_string(), "http://rain.us/test");
        assert_eq!(request.header("test"), Some("test"));

        let body = request.take_body().expect("body");
        assert_eq!(body.size_hint(), Some(15));
    }

    #[test]
    fn build_propagates_codec_error_verbatim() {
        let config = RequestConfig::new(FailingCodec::default());

        let result = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("http://rain.us/test")
            .with_method("POST")
            .with_body(123)
            .build();

        let_assert!(Err(err) = result);
        check!(err.status() == 500);
        check!(err.message() == "Marshaller error");
        check!(err.cause().is_none());
        check!(config.codec().calls.load(Ordering::SeqCst) == 1);
    }

    #[test]
    fn build_without_body_skips_codec() {
        let config = RequestConfig::new(FailingCodec::default());

        let request = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test/post")
            .with_method("POST")
            .build()
            .expect("build");

        assert_eq!(request.body().and_then(Body::size_hint), Some(0));
        assert_eq!(config.codec().calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn build_fails_on_malformed_endpoint() {
        let config = RequestConfig::default();

        let result = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("\n / /")
            .with_method("GET")
            .build();

        let_assert!(Err(err) = result);
        check!(err.status() == 500);
        check!(err.message() == "error creating request");
        check!(err.cause().is_some());
    }

    #[test]
    fn build_fails_without_endpoint() {
        let config = RequestConfig::default();

        let err = RequestBuilder::new(Context::background(), &config)
            .with_method("GET")
            .build()
            .expect_err("should fail");

        assert_eq!(err.message(), "error creating request");
    }

    #[test]
    fn build_fails_on_invalid_method() {
        let config = RequestConfig::default();

        let err = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test")
            .with_method("GET POST")
            .build()
            .expect_err("should fail");

        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "error creating request");
    }

    #[test]
    fn build_fails_on_invalid_header_value() {
        let config = RequestConfig::default();

        let err = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test")
            .with_headers([("x-bad", "line\nbreak")])
            .build()
            .expect_err("should fail");

        assert_eq!(err.message(), "error creating request");
    }

    #[test]
    fn empty_method_defaults_to_get() {
        let config = RequestConfig::default();

        let request = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test/get")
            .build()
            .expect("build");

        assert_eq!(request.method(), &Method::GET);
    }

    #[test]
    fn stamps_request_id_from_context() {
        let config = RequestConfig::default();
        let ctx = Context::background().with_request_id("req-1");

        let request = RequestBuilder::new(ctx, &config)
            .with_endpoint("/test")
            .with_headers([(REQUEST_ID_HEADER, "overridden")])
            .build()
            .expect("build");

        assert_eq!(request.header("X-Request-Id"), Some("req-1"));
    }

    #[test]
    fn stamps_empty_request_id_when_unset() {
        let config = RequestConfig::default();

        let request = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test")
            .build()
            .expect("build");

        assert_eq!(request.header(REQUEST_ID_HEADER), Some(""));
    }

    #[test]
    fn custom_request_id_source() {
        let config = RequestConfig::default().request_id_source(FixedId("fixed"));

        let request = RequestBuilder::new(Context::background(), &config)
            .with_endpoint("/test")
            .build()
            .expect("build");

        assert_eq!(request.header(REQUEST_ID_HEADER), Some("fixed"));
    }

    #[test]
    fn builder_carries_context() {
        let config = RequestConfig::default();
        let ctx = Context::background();

        let request = RequestBuilder::new(ctx.clone(), &config)
            .with_endpoint("/test")
            .build()
            .expect("build");

        ctx.cancel();
        assert!(request.context().err().is_some());
    }
}
