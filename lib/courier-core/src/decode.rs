//! Body decoding.
//!
//! [`Decoder`] reads a whole body and parses it as JSON. Every decode call
//! takes ownership of the response or request, so the body stream is released
//! on every exit path, including the argument checks that fail after a body
//! was already attached.

use std::future::Future;

use http::StatusCode;
use serde::de::DeserializeOwned;

use crate::codec::{from_json, from_json_stream};
use crate::{Body, Error, Request, Response, Result};

// ============================================================================
// Error Decoder Trait
// ============================================================================

/// Decodes a failed response into an [`Error`].
///
/// The executor calls this once for every response with the generic
/// server-error status. The returned error becomes the cause of the
/// `dependency failed` error.
pub trait ErrorDecoder: Send + Sync {
    /// Decode the body of `response` into an [`Error`].
    fn decode(&self, response: Response) -> impl Future<Output = Error> + Send;
}

// ============================================================================
// JSON Decoder
// ============================================================================

/// Stateless JSON body decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Create a decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Read the response body and parse it as JSON.
    ///
    /// # Errors
    ///
    /// - `500 response cannot be nil` if `response` is `None`
    /// - `500 response body cannot be nil` if it has no body
    /// - `500 error decoding response body` if reading or parsing fails
    pub async fn decode_response_body<T: DeserializeOwned>(
        &self,
        response: Option<Response>,
    ) -> Result<T> {
        let body = response_body(response)?;
        read_response(body).await
    }

    /// Like [`decode_response_body`](Self::decode_response_body), writing into `target`.
    ///
    /// # Errors
    ///
    /// Same as [`decode_response_body`](Self::decode_response_body), plus
    /// `500 target cannot be nil` if `target` is `None`. All argument checks
    /// happen before any byte is read.
    pub async fn decode_response_body_into<T: DeserializeOwned>(
        &self,
        response: Option<Response>,
        target: Option<&mut T>,
    ) -> Result<()> {
        let body = response_body(response)?;
        let target = target.ok_or_else(nil_target)?;
        *target = read_response(body).await?;
        Ok(())
    }

    /// Decode a server-supplied error body.
    ///
    /// A status left unset (`0`) by the server is filled in from the response
    /// status. If decoding itself fails, that failure is returned instead.
    pub async fn decode_error_body(&self, response: Option<Response>) -> Error {
        let status = response.as_ref().map(Response::status);

        match self.decode_response_body::<Error>(response).await {
            Ok(mut decoded) => {
                if let Some(status) = status {
                    decoded.backfill_status(status);
                }
                decoded
            }
            Err(err) => err,
        }
    }

    /// Read an inbound request body and parse it as JSON.
    ///
    /// # Errors
    ///
    /// - `500 request cannot be nil` if `request` is `None`
    /// - `500 request body cannot be nil` if it has no body
    /// - `400 error reading request body` if the stream fails
    /// - `400 error unmarshalling request body` if parsing fails
    pub async fn decode_request_body<T: DeserializeOwned>(
        &self,
        request: Option<Request>,
    ) -> Result<T> {
        let body = request_body(request)?;
        read_request(body).await
    }

    /// Like [`decode_request_body`](Self::decode_request_body), writing into `target`.
    ///
    /// # Errors
    ///
    /// Same as [`decode_request_body`](Self::decode_request_body), plus
    /// `500 target cannot be nil` if `target` is `None`.
    pub async fn decode_request_body_into<T: DeserializeOwned>(
        &self,
        request: Option<Request>,
        target: Option<&mut T>,
    ) -> Result<()> {
        let body = request_body(request)?;
        let target = target.ok_or_else(nil_target)?;
        *target = read_request(body).await?;
        Ok(())
    }
}

impl ErrorDecoder for Decoder {
    fn decode(&self, response: Response) -> impl Future<Output = Error> + Send {
        self.decode_error_body(Some(response))
    }
}

fn internal(message: &str) -> Error {
    Error::new(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn nil_target() -> Error {
    internal("target cannot be nil")
}

fn response_body(response: Option<Response>) -> Result<Body> {
    let mut response = response.ok_or_else(|| internal("response cannot be nil"))?;
    response
        .take_body()
        .ok_or_else(|| internal("response body cannot be nil"))
}

fn request_body(request: Option<Request>) -> Result<Body> {
    let mut request = request.ok_or_else(|| internal("request cannot be nil"))?;
    request
        .take_body()
        .ok_or_else(|| internal("request body cannot be nil"))
}

async fn read_response<T: DeserializeOwned>(body: Body) -> Result<T> {
    let bytes = body
        .bytes()
        .await
        .map_err(|err| internal("error decoding response body").with_cause(err))?;

    from_json_stream(&bytes)
        .map_err(|err| internal("error decoding response body").with_cause(err))
}

async fn read_request<T: DeserializeOwned>(body: Body) -> Result<T> {
    let bytes = body.bytes().await.map_err(|err| {
        Error::new(StatusCode::BAD_REQUEST, "error reading request body").with_cause(err)
    })?;

    from_json(&bytes).map_err(|err| {
        Error::new(StatusCode::BAD_REQUEST, "error unmarshalling request body").with_cause(err)
    })
}
