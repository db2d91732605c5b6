//! Unified SDK error types.

use thiserror::Error;

/// Top-level SDK error.
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("WebSocket error: {0}")]
    Ws(#[from] WsError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// HTTP-layer errors.
///
/// A call returns one of these only after recovery is exhausted: an expired
/// token is refreshed and retried once before `Unauthorized` surfaces, and a
/// network-class failure hops to the fallback host once before `NetworkError`
/// or `ServerError` surfaces.
#[derive(Error, Debug)]
pub enum HttpError {
    /// Terminal authentication failure — the session could not be refreshed,
    /// or the retried request was rejected again.
    #[error("Unauthorized")]
    Unauthorized,

    /// The server understood the credentials but denied the operation.
    /// Never retried.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 5xx from the server.
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Transport-level failure: connection refused, DNS, timeout.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// A success response whose body did not decode as the expected type.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Any remaining non-success response, with the server-provided message.
    #[error("Request failed: {message}")]
    Other { status: Option<u16>, message: String },
}

impl HttpError {
    /// Whether this error class is eligible for the one-shot fallback hop.
    pub fn is_network_class(&self) -> bool {
        matches!(
            self,
            HttpError::NetworkError(_) | HttpError::ServerError { .. }
        )
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() || e.is_request() {
            HttpError::NetworkError(e.to_string())
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::Other {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

/// WebSocket errors.
#[derive(Error, Debug)]
pub enum WsError {
    #[error("Not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Connection closed: code={code:?} reason={reason}")]
    Closed { code: Option<u16>, reason: String },
}

/// Authentication errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Login failed: {0}")]
    LoginFailed(String),

    #[error("No refresh token in the stored session")]
    NoRefreshToken,
}
