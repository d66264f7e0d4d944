//! Error types for the LoginTC admin client.
//!
//! # Design
//! Two layers. `TransportError` is what the REST layer produces: either no
//! response was obtained, or a response arrived with a status outside
//! 200/201/202. `Error` is what callers see: `classify` turns a failed
//! response into `Api` or `NoToken` when the body carries the service's
//! error envelope, and everything else becomes `Internal`.
//!
//! The branch is driven by the envelope's `code`, never by the HTTP status.

use serde::Deserialize;
use thiserror::Error;

/// Error code the service uses when a user has no usable token in a domain.
pub const NO_TOKEN_CODE: &str = "api.error.notfound.token";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The scheme/host/port/path combination does not form a valid URL.
    #[error("invalid request target: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No response was received (DNS, connect, TLS, I/O).
    #[error("HTTP transport failed: {0}")]
    Http(#[source] BoxError),

    /// The proxy settings could not be turned into a usable proxy.
    #[error("invalid proxy configuration: {0}")]
    Proxy(String),

    /// The server answered with a status other than 200, 201 or 202.
    #[error("API returned status code {status}")]
    Status { status: u16, body: String },
}

impl TransportError {
    pub fn http(err: impl Into<BoxError>) -> Self {
        TransportError::Http(err.into())
    }
}

/// Client-side defect unrelated to the API's own error semantics.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error(transparent)]
    Transport(TransportError),

    /// A request body could not be encoded or a response body decoded.
    #[error("JSON mapping failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// An error reported by the LoginTC API itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Errors returned by every `LoginTc` operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("internal client error: {0}")]
    Internal(#[from] InternalError),

    /// The API rejected the request.
    #[error("{0}")]
    Api(ApiError),

    /// The user has no valid token for the domain: it does not exist, is not
    /// loaded yet, or was revoked.
    #[error("no token: {0}")]
    NoToken(ApiError),
}

impl Error {
    /// The API error carried by `Api` and `NoToken`; `None` for `Internal`.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) | Error::NoToken(api) => Some(api),
            Error::Internal(_) => None,
        }
    }

    pub fn is_no_token(&self) -> bool {
        matches!(self, Error::NoToken(_))
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, body } => classify(status, &body),
            other => Error::Internal(InternalError::Transport(other)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(InternalError::Json(err))
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    errors: Vec<serde_json::Value>,
}

/// Classify a failed response.
///
/// Only the first entry of the envelope is consulted; later entries may be
/// anything. Bodies that are not an envelope with a well-formed first entry
/// yield `Internal` wrapping the original status and body.
pub fn classify(status: u16, body: &str) -> Error {
    match first_api_error(body) {
        Some(api) if api.code == NO_TOKEN_CODE => Error::NoToken(api),
        Some(api) => Error::Api(api),
        None => Error::Internal(InternalError::Transport(TransportError::Status {
            status,
            body: body.to_owned(),
        })),
    }
}

fn first_api_error(body: &str) -> Option<ApiError> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let first = envelope.errors.into_iter().next()?;
    serde_json::from_value(first).ok()
}
