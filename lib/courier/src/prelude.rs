//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

pub use crate::{
    Client, Context, Decoder, Error, ErrorDecoder, Executor, Headers, HyperTransport,
    RequestBuilder, RequestConfig, Response, Result, StatusCode, Transport,
};
pub use serde::{Deserialize, Serialize};
