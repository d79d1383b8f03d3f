//! Request correlation identifiers.

use crate::Context;

/// Header every built request carries its correlation identifier in.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Source of the correlation identifier stamped on outgoing requests.
pub trait RequestIdSource: Send + Sync {
    /// Identifier for a request made within `context`. May be empty.
    fn request_id(&self, context: &Context) -> String;
}

/// Reads the identifier set with [`Context::with_request_id`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextRequestId;

impl RequestIdSource for ContextRequestId {
    fn request_id(&self, context: &Context) -> String {
        context.request_id().unwrap_or_default().to_owned()
    }
}
