//! Error types for chatter.
//!
//! Every failure the client can produce is surfaced as a variant of [`Error`].
//! The client itself never retries; callers inspect the predicates on
//! [`Error`] (for example [`Error::is_retryable`]) to decide what to do.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

use serde::Deserialize;

/// The main error type for chatter.
#[derive(Clone, Debug)]
pub enum Error {
    /// No usable API credential.
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The request could not be built (bad URL, unserializable body, bad header).
    RequestConstruction {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Network-level failure: DNS, connect, reset, or a read on the response body.
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The request did not complete within the configured timeout.
    Timeout {
        /// Human-readable error message.
        message: String,
        /// Duration of the timeout in seconds.
        duration: Option<f64>,
    },

    /// The request was cancelled by the caller.
    Abort {
        /// Human-readable error message.
        message: String,
    },

    /// The server answered with a non-2xx status.
    UnexpectedStatus {
        /// HTTP status code.
        status_code: u16,
        /// The `error.message` field of the body, when the body carries one.
        message: Option<String>,
        /// The raw response body.
        body: String,
        /// Request ID for debugging and support.
        request_id: Option<String>,
    },

    /// A buffered response body did not match the expected schema.
    Decode {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// A `data:` frame of an event stream did not match the expected schema.
    InvalidStreamFrame {
        /// Human-readable error message.
        message: String,
        /// The payload of the offending frame.
        frame: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// Unknown error.
    Unknown {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Creates a new authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
        }
    }

    /// Creates a new request construction error.
    pub fn request_construction(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::RequestConstruction {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new timeout error.
    pub fn timeout(message: impl Into<String>, duration: Option<f64>) -> Self {
        Error::Timeout {
            message: message.into(),
            duration,
        }
    }

    /// Creates a new abort error.
    pub fn abort(message: impl Into<String>) -> Self {
        Error::Abort {
            message: message.into(),
        }
    }

    /// Creates a new unexpected status error from the raw body.
    ///
    /// The body is kept verbatim.  When it happens to be an API error object
    /// (`{"error": {"message": ...}}`) the message is pulled out for display.
    pub fn unexpected_status(
        status_code: u16,
        body: impl Into<String>,
        request_id: Option<String>,
    ) -> Self {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: Option<String>,
        }

        let body = body.into();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error)
            .and_then(|e| e.message);
        Error::UnexpectedStatus {
            status_code,
            message,
            body,
            request_id,
        }
    }

    /// Creates a new decode error.
    pub fn decode(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Decode {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new invalid stream frame error.
    pub fn invalid_stream_frame(
        message: impl Into<String>,
        frame: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::InvalidStreamFrame {
            message: message.into(),
            frame: frame.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new unknown error.
    pub fn unknown(message: impl Into<String>) -> Self {
        Error::Unknown {
            message: message.into(),
        }
    }

    /// Returns true if the credential was missing or rejected.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Error::Authentication { .. }
                | Error::UnexpectedStatus {
                    status_code: 401,
                    ..
                }
        )
    }

    /// Returns true if this error is a request construction error.
    pub fn is_request_construction(&self) -> bool {
        matches!(self, Error::RequestConstruction { .. })
    }

    /// Returns true if this error is a transport-level failure.
    ///
    /// Timeouts and cancellations are transport failures too.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport { .. } | Error::Timeout { .. } | Error::Abort { .. }
        )
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Returns true if the caller cancelled the request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Abort { .. })
    }

    /// Returns true if the server answered with a non-2xx status.
    pub fn is_unexpected_status(&self) -> bool {
        matches!(self, Error::UnexpectedStatus { .. })
    }

    /// Returns true if a response body or stream frame failed to decode.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            Error::Decode { .. } | Error::InvalidStreamFrame { .. }
        )
    }

    /// Returns true if the server rejected the request for rate limiting.
    pub fn is_rate_limit(&self) -> bool {
        self.status_code() == Some(429)
    }

    /// Returns true if repeating the whole request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::UnexpectedStatus { status_code, .. } => {
                matches!(status_code, 408 | 409 | 429 | 500..=599)
            }
            Error::Timeout { .. } => true,
            Error::Transport { .. } => true,
            _ => false,
        }
    }

    /// Returns the request ID associated with this error, if any.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::UnexpectedStatus { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Authentication { message } => {
                write!(f, "Authentication error: {message}")
            }
            Error::RequestConstruction { message, .. } => {
                write!(f, "Failed to create the request: {message}")
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Timeout { message, duration } => {
                if let Some(duration) = duration {
                    write!(f, "Timeout error: {message} ({duration} seconds)")
                } else {
                    write!(f, "Timeout error: {message}")
                }
            }
            Error::Abort { message } => {
                write!(f, "Request aborted: {message}")
            }
            Error::UnexpectedStatus {
                status_code,
                message,
                body,
                request_id,
            } => {
                let detail = message.as_deref().unwrap_or(body.as_str());
                if let Some(request_id) = request_id {
                    write!(
                        f,
                        "Unexpected response code {status_code}: {detail} (Request ID: {request_id})"
                    )
                } else {
                    write!(f, "Unexpected response code {status_code}: {detail}")
                }
            }
            Error::Decode { message, .. } => {
                write!(f, "Failed to parse response: {message}")
            }
            Error::InvalidStreamFrame { message, .. } => {
                write!(f, "Invalid json stream data: {message}")
            }
            Error::Unknown { message } => {
                write!(f, "Unknown error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::RequestConstruction { source, .. }
            | Error::Transport { source, .. }
            | Error::Decode { source, .. }
            | Error::InvalidStreamFrame { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::transport(format!("I/O error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decode(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::request_construction(format!("URL parse error: {err}"), Some(Box::new(err)))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::timeout(format!("Request timed out: {err}"), None)
        } else if err.is_builder() {
            Error::request_construction(format!("{err}"), Some(Box::new(err)))
        } else if err.is_decode() {
            Error::decode(format!("{err}"), Some(Box::new(err)))
        } else {
            Error::transport(format!("Request failed: {err}"), Some(Box::new(err)))
        }
    }
}

/// A specialized Result type for chatter operations.
pub type Result<T> = std::result::Result<T, Error>;
