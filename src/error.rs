use hyper::Method;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for misugo
#[derive(Error, Debug)]
pub enum Error {
    /// The request body was empty, malformed or did not match the target type
    #[error("{0}")]
    Decode(String),

    #[error("failed to encode response: {0}")]
    Encode(String),

    /// Failure raised by a route handler; the message is sent to the client as-is
    #[error("{0}")]
    Handler(String),

    #[error("route already registered: {method} {pattern}")]
    RouteConflict { method: Method, pattern: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn handler(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get error code for logs and diagnostics
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Decode(_) => "E_DECODE",
            Error::Encode(_) => "E_ENCODE",
            Error::Handler(_) => "E_HANDLER",
            Error::RouteConflict { .. } => "E_ROUTE_CONFLICT",
            Error::Transport(_) => "E_TRANSPORT",
            Error::Config(_) => "E_CONFIG",
            Error::Http(_) => "E_HTTP",
            Error::Io(_) => "E_IO",
            Error::Internal(_) => "E_INTERNAL",
        }
    }

    /// Get HTTP status code for the error
    ///
    /// Every failure that reaches the handler adapter maps to 500; there is
    /// no per-kind classification.
    pub fn status_code(&self) -> u16 {
        500
    }
}

// Encoding goes through `Error::Encode` explicitly, so a bare serde_json
// error is always a decode failure.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
