//! Tower service adapter.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use courier_core::Transport;
use tower::ServiceExt;
use tower_service::Service;

use crate::{Request, Response};

/// Adapts any tower [`Service`] into a [`Transport`].
///
/// The wrapped service sits behind a mutex so the adapter is `Sync`; each
/// send clones the service and releases the lock before the call starts.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::ServiceTransport;
/// use tower::ServiceBuilder;
///
/// let stack = ServiceBuilder::new()
///     .concurrency_limit(8)
///     .service(my_service);
/// let transport = ServiceTransport::new(stack);
/// ```
pub struct ServiceTransport<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> ServiceTransport<S> {
    /// Wrap `service`.
    pub fn new(service: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }
}

impl<S> Clone for ServiceTransport<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> std::fmt::Debug for ServiceTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceTransport").finish_non_exhaustive()
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Error: std::error::Error + Send + Sync + 'static,
    S::Future: Send,
{
    type Error = S::Error;

    fn send(&self, request: Request) -> impl Future<Output = Result<Response, S::Error>> + Send {
        let service = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        service.oneshot(request)
    }
}
