use crate::registry::ParamKind;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use todokit_http::HttpError;

/// Caller-side defect: the request could not be built as asked.
///
/// Never sent to the server and never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigurationError {
    #[error("endpoint `{endpoint}` needs path parameter `{param}`")]
    MissingPathParam {
        endpoint: &'static str,
        param: &'static str,
    },

    #[error("unknown endpoint `{0}`")]
    UnknownEndpoint(String),

    #[error("endpoint `{endpoint}` has no path parameter `{param}`")]
    UnknownPathParam {
        endpoint: &'static str,
        param: String,
    },

    #[error("path parameter `{param}` of `{endpoint}` must be a {expected}")]
    PathParamKind {
        endpoint: &'static str,
        param: &'static str,
        expected: ParamKind,
    },

    #[error("endpoint `{endpoint}` takes no request payload")]
    UnexpectedBody { endpoint: &'static str },

    #[error("cannot encode request for `{endpoint}`: {reason}")]
    Encode {
        endpoint: &'static str,
        reason: String,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// Server rejection, undecodable success body, or no response at all.
///
/// `status` is 0 when the server could not be reached; `payload` is then
/// `None`. Otherwise `payload` holds the decoded error body, or an empty
/// object when the body was not JSON.
#[derive(Debug)]
pub struct ApiError {
    status: u16,
    payload: Option<Value>,
    reason: Option<String>,
    source: Option<Box<HttpError>>,
}

const NETWORK_ERROR: &str = "network error: no response from server";

impl ApiError {
    /// Non-2xx response with its best-effort decoded body.
    #[must_use]
    pub fn from_response(status: u16, payload: Value) -> Self {
        Self {
            status,
            payload: Some(payload),
            reason: None,
            source: None,
        }
    }

    /// 2xx response whose body does not match the response type.
    #[must_use]
    pub fn undecodable(status: u16, payload: Value, reason: impl Into<String>) -> Self {
        Self {
            status,
            payload: Some(payload),
            reason: Some(reason.into()),
            source: None,
        }
    }

    /// No response was obtained.
    #[must_use]
    pub fn transport(source: HttpError) -> Self {
        Self {
            status: 0,
            payload: None,
            reason: Some(source.to_string()),
            source: Some(Box::new(source)),
        }
    }

    /// A response arrived but its body could not be read.
    #[must_use]
    pub(crate) fn unreadable(status: u16, source: HttpError) -> Self {
        Self {
            status,
            payload: Some(Value::Object(serde_json::Map::new())),
            reason: Some(source.to_string()),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Why the exchange failed on this side (transport or decode), if it did
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        self.status == 0
    }

    /// Text to show a user.
    ///
    /// Takes the backend's `detail` string, or the `msg` entries of a
    /// validation `detail` list joined with `"; "`, then falls back to the
    /// HTTP reason phrase.
    #[must_use]
    pub fn message(&self) -> String {
        if let Some(detail) = self.payload.as_ref().and_then(|p| p.get("detail")) {
            match detail {
                Value::String(s) if !s.is_empty() => return s.clone(),
                Value::Array(entries) => {
                    let msgs: Vec<&str> = entries
                        .iter()
                        .filter_map(|e| e.get("msg").and_then(Value::as_str))
                        .collect();
                    if !msgs.is_empty() {
                        return msgs.join("; ");
                    }
                }
                _ => {}
            }
        }

        if self.is_transport() {
            return NETWORK_ERROR.to_owned();
        }

        http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .map_or_else(|| format!("HTTP {}", self.status), str::to_owned)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_transport() {
            return f.write_str(NETWORK_ERROR);
        }
        write!(f, "HTTP {}: {}", self.status, self.message())?;
        if let Some(reason) = &self.reason {
            write!(f, " ({reason})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Every failure of a dispatched call
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ClientError {
    /// The server-side error, if this is one
    #[must_use]
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(e) => Some(e),
            ClientError::Configuration(_) => None,
        }
    }

    /// HTTP status of an [`ApiError`]; `None` for configuration errors.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.as_api().map(ApiError::status)
    }

    /// User-facing text; see [`ApiError::message`].
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            ClientError::Api(e) => e.message(),
            ClientError::Configuration(e) => e.to_string(),
        }
    }
}
