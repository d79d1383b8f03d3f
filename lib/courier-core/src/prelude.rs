//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    Body, Codec, Context, Decoder, Error, ErrorDecoder, Executor, Headers, JsonCodec, Request,
    RequestBuilder, RequestConfig, Response, Result, Transport,
};
