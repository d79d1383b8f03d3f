//! Request execution and error classification.
//!
//! The [`Executor`] sends a built [`Request`] through a [`Transport`] and maps
//! the outcome onto courier's error vocabulary:
//!
//! | Outcome                                   | Result                           |
//! |-------------------------------------------|----------------------------------|
//! | transport failed, context done            | `504 request timed out`          |
//! | transport failed, anything else           | `500 error executing request`    |
//! | response status is exactly 500            | `424 dependency failed`          |
//! | any other response                        | the response, untouched          |
//!
//! For a `424`, the upstream body is decoded once with the configured
//! [`ErrorDecoder`] and attached as the cause.

use std::error::Error as StdError;
use std::future::Future;

use http::StatusCode;
use tracing::{debug, warn};

use crate::{ContextError, Decoder, Error, ErrorDecoder, Request, Response, Result, Transport};

/// Sends requests and classifies failures.
#[derive(Debug, Clone, Default)]
pub struct Executor<T, D = Decoder> {
    transport: T,
    decoder: D,
}

impl<T: Transport> Executor<T> {
    /// Executor decoding upstream errors with the JSON [`Decoder`].
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            decoder: Decoder,
        }
    }
}

impl<T: Transport, D: ErrorDecoder> Executor<T, D> {
    /// Executor with a custom upstream error decoder.
    #[must_use]
    pub const fn with_decoder(transport: T, decoder: D) -> Self {
        Self { transport, decoder }
    }

    /// Underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Upstream error decoder.
    #[must_use]
    pub const fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Send `request` once and classify the outcome.
    ///
    /// # Errors
    ///
    /// - `504 request timed out` when the transport gave up because the request context was done
    /// - `500 error executing request` for every other transport failure
    /// - `424 dependency failed` when the upstream answered `500`; the decoded upstream error is the cause
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let method = request.method().clone();
        let uri = request.uri().clone();
        debug!(%method, %uri, "executing request");

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                let err = classify_transport_error(err);
                warn!(
                    %method,
                    %uri,
                    error_status = err.status(),
                    error_message = err.message(),
                    error = %err,
                    "request failed"
                );
                return Err(err);
            }
        };

        if response.status() != StatusCode::INTERNAL_SERVER_ERROR.as_u16() {
            debug!(%method, %uri, status = response.status(), "request completed");
            return Ok(response);
        }

        let upstream = self.decoder.decode(response).await;
        warn!(
            %method,
            %uri,
            error_status = upstream.status(),
            error_message = upstream.message(),
            "dependency failed"
        );

        Err(Error::new(StatusCode::FAILED_DEPENDENCY, "dependency failed").with_cause(upstream))
    }
}

impl<T: Transport, D: ErrorDecoder> Transport for Executor<T, D> {
    type Error = Error;

    fn send(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        self.execute(request)
    }
}

fn classify_transport_error<E>(err: E) -> Error
where
    E: StdError + Send + Sync + 'static,
{
    let timed_out = std::iter::successors(Some(&err as &(dyn StdError + 'static)), |err| {
        (*err).source()
    })
    .any(|err| err.is::<ContextError>());

    if timed_out {
        Error::new(StatusCode::GATEWAY_TIMEOUT, "request timed out").with_cause(err)
    } else {
        Error::new(StatusCode::INTERNAL_SERVER_ERROR, "error executing request").with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use assert2::{check, let_assert};
    use http::{HeaderMap, Method, Uri};

    use super::*;
    use crate::{Body, Context, TransportError};

    type Outcome = Box<dyn Fn() -> std::result::Result<Response, TransportError> + Send + Sync>;

    /// Transport answering with a fixed outcome and counting calls.
    struct Stub {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(
            outcome: impl Fn() -> std::result::Result<Response, TransportError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                outcome: Box::new(outcome),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Transport for Stub {
        type Error = TransportError;

        async fn send(&self, _request: Request) -> std::result::Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    /// Transport that never answers before the context is done.
    struct Hanging;

    impl Transport for Hanging {
        type Error = TransportError;

        async fn send(&self, request: Request) -> std::result::Result<Response, TransportError> {
            let ctx = request.context().clone();
            ctx.run(std::future::pending::<()>()).await?;
            Ok(Response::without_body(200))
        }
    }

    /// Decoder counting how often it was asked.
    #[derive(Default)]
    struct CountingDecoder {
        calls: Arc<AtomicUsize>,
    }

    impl ErrorDecoder for CountingDecoder {
        async fn decode(&self, response: Response) -> Error {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Decoder.decode_error_body(Some(response)).await
        }
    }

    fn request(ctx: Context) -> Request {
        Request::from_parts(
            Method::GET,
            Uri::from_static("http://upstream.test/users/1"),
            HeaderMap::new(),
            Some(Body::empty()),
            ctx,
        )
    }

    fn json(status: u16, body: &'static str) -> Response {
        Response::new(status, HeaderMap::new(), Body::from(body))
    }

    #[tokio::test]
    async fn success_is_returned_untouched() {
        let stub = Stub::new(|| Ok(json(200, r#"{"id":1}"#)));
        let executor = Executor::new(&stub);

        let response = executor.execute(request(Context::background())).await.expect("response");

        assert_eq!(response.status(), 200);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_and_other_server_statuses_pass_through() {
        for status in [201, 302, 404, 422, 502, 503] {
            let executor = Executor::with_decoder(
                Stub::new(move || Ok(Response::without_body(status))),
                CountingDecoder::default(),
            );

            let response = executor.execute(request(Context::background())).await.expect("response");

            assert_eq!(response.status(), status);
            assert_eq!(executor.decoder().calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn internal_error_becomes_dependency_failure() {
        let decoder = CountingDecoder::default();
        let calls = Arc::clone(&decoder.calls);
        let executor = Executor::with_decoder(
            Stub::new(|| Ok(json(500, r#"{"status":0,"message":"upstream down"}"#))),
            decoder,
        );

        let result = executor.execute(request(Context::background())).await;

        let_assert!(Err(err) = result);
        check!(err.status() == 424);
        check!(err.message() == "dependency failed");
        check!(err.is_dependency_failure());
        check!(calls.load(Ordering::SeqCst) == 1);

        let_assert!(Some(cause) = err.cause());
        let_assert!(Some(upstream) = cause.downcast_ref::<Error>());
        check!(upstream.status() == 500);
        check!(upstream.message() == "upstream down");
    }

    #[tokio::test]
    async fn undecodable_upstream_error_is_still_dependency_failure() {
        let executor = Executor::new(Stub::new(|| Ok(json(500, "<html>oops</html>"))));

        let err = executor
            .execute(request(Context::background()))
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), 424);
        let upstream = err
            .cause()
            .and_then(|cause| cause.downcast_ref::<Error>())
            .expect("decoded cause");
        assert_eq!(upstream.message(), "error decoding response body");
    }

    #[tokio::test]
    async fn connection_failure_is_execution_error() {
        let executor = Executor::new(Stub::new(|| {
            Err(TransportError::Connection("connection refused".to_string()))
        }));

        let err = executor
            .execute(request(Context::background()))
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), 500);
        assert_eq!(err.message(), "error executing request");
        assert_eq!(
            err.cause().map(ToString::to_string).as_deref(),
            Some("connection error: connection refused")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_is_timeout() {
        let executor = Executor::new(Hanging);
        let ctx = Context::background().with_timeout(Duration::from_millis(100));

        let err = executor.execute(request(ctx)).await.expect_err("should fail");

        assert_eq!(err.status(), 504);
        assert_eq!(err.message(), "request timed out");
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn cancellation_is_timeout() {
        let executor = Executor::new(Hanging);
        let ctx = Context::background();
        ctx.cancel();

        let err = executor.execute(request(ctx)).await.expect_err("should fail");

        assert_eq!(err.status(), 504);
    }

    #[tokio::test]
    async fn context_error_directly_is_timeout() {
        struct Bare;

        impl Transport for Bare {
            type Error = ContextError;

            async fn send(&self, _request: Request) -> std::result::Result<Response, ContextError> {
                Err(ContextError::DeadlineExceeded)
            }
        }

        let err = Executor::new(Bare)
            .execute(request(Context::background()))
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), 504);
    }

    #[tokio::test]
    async fn nested_context_error_is_timeout() {
        #[derive(Debug, derive_more::Display, derive_more::Error)]
        #[display("middleware failed")]
        struct Wrapped {
            source: TransportError,
        }

        struct Layered;

        impl Transport for Layered {
            type Error = Wrapped;

            async fn send(&self, _request: Request) -> std::result::Result<Response, Wrapped> {
                Err(Wrapped {
                    source: TransportError::Context(ContextError::Canceled),
                })
            }
        }

        let err = Executor::new(Layered)
            .execute(request(Context::background()))
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), 504);
        assert_eq!(err.message(), "request timed out");
    }

    /// Subscriber recording the field names of every event.
    #[derive(Clone, Default)]
    struct FieldNames(Arc<Mutex<Vec<String>>>);

    impl FieldNames {
        fn contains(&self, name: &str) -> bool {
            self.0.lock().expect("lock").iter().any(|field| field == name)
        }
    }

    impl tracing::Subscriber for FieldNames {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }

        fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}

        fn event(&self, event: &tracing::Event<'_>) {
            let mut names = self.0.lock().expect("lock");
            names.extend(event.fields().map(|field| field.name().to_string()));
        }

        fn enter(&self, _span: &tracing::span::Id) {}

        fn exit(&self, _span: &tracing::span::Id) {}
    }

    #[tokio::test]
    async fn failures_are_logged_with_error_fields() {
        let fields = FieldNames::default();
        let _guard = tracing::subscriber::set_default(fields.clone());

        let executor = Executor::new(Stub::new(|| Ok(json(500, r#"{"message":"boom"}"#))));
        executor
            .execute(request(Context::background()))
            .await
            .expect_err("should fail");

        check!(fields.contains("error_status"));
        check!(fields.contains("error_message"));
    }

    #[tokio::test]
    async fn executor_is_a_transport() {
        let inner = Executor::new(Stub::new(|| Ok(json(500, r#"{"message":"boom"}"#))));

        let err = inner
            .send(request(Context::background()))
            .await
            .expect_err("should fail");

        assert_eq!(err.status(), 424);
    }
}
