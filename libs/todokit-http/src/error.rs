use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Why a URL was refused before sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidUriKind {
    ParseError,
    /// No `host[:port]`
    MissingAuthority,
    /// No `http://` or `https://` prefix
    MissingScheme,
}

/// Everything that can go wrong between building a request and reading its body
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HttpError {
    #[error("cannot build request: {0}")]
    RequestBuild(#[from] http::Error),

    #[error("invalid header name: {0}")]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connect, write or read failure below HTTP
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    #[error("TLS setup failed: {0}")]
    Tls(#[source] BoxError),

    /// Decompressed body crossed `max_body_size`
    #[error("response body exceeds {limit} bytes (read {actual})")]
    BodyTooLarge { limit: usize, actual: usize },

    /// Non-2xx answer; `body_preview` holds at most
    /// [`ERROR_BODY_PREVIEW_LIMIT`](crate::ERROR_BODY_PREVIEW_LIMIT) bytes
    #[error("HTTP {status}: {body_preview}")]
    HttpStatus {
        status: http::StatusCode,
        body_preview: String,
        content_type: Option<String>,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot form-encode body: {0}")]
    FormEncode(#[from] serde_urlencoded::ser::Error),

    /// The request buffer is full; nothing was sent
    #[error("client overloaded: request buffer full")]
    Overloaded,

    /// The buffer worker is gone
    #[error("client unavailable: dispatch worker stopped")]
    ServiceClosed,

    /// `reason` is for logs; match on `kind`
    #[error("invalid URL '{url}': {reason}")]
    InvalidUri {
        url: String,
        kind: InvalidUriKind,
        reason: String,
    },

    #[error("URL scheme '{scheme}' refused: {reason}")]
    InvalidScheme { scheme: String, reason: String },
}

impl HttpError {
    /// Whether the error means no response was obtained from the server.
    ///
    /// `HttpStatus`, `BodyTooLarge` and `Json` happen after a response
    /// arrived; everything else fails before or during the exchange.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        !matches!(
            self,
            HttpError::HttpStatus { .. } | HttpError::BodyTooLarge { .. } | HttpError::Json(_)
        )
    }
}

impl From<hyper::Error> for HttpError {
    fn from(err: hyper::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}

impl From<hyper_util::client::legacy::Error> for HttpError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        HttpError::Transport(Box::new(err))
    }
}
