use crate::client::{BufferedService, map_buffer_error, try_acquire_buffer_slot};
use crate::config::TransportSecurity;
use crate::error::{HttpError, InvalidUriKind};
use crate::response::{HttpResponse, ResponseBody};
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use http::{Request, Response};
use http_body_util::Full;
use serde::Serialize;
use tower::Service;

const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Clone, Debug)]
enum BodyKind {
    Empty,
    Raw(Bytes),
    Json(Bytes),
    Form(Bytes),
}

/// One outgoing request, configured fluently and sent with [`send`](RequestBuilder::send)
///
/// Headers are kept in a [`HeaderMap`]; setting a header that is already
/// present replaces it. A `Content-Type` matching the body kind is added only
/// when none was set explicitly.
///
/// Query strings are not composed here. Callers pass the final URL:
///
/// ```ignore
/// let resp = client
///     .get("http://localhost:8000/api/v1/user/?skip=0&limit=20")
///     .header("authorization", "Bearer abc")
///     .send()
///     .await?;
/// ```
#[must_use = "RequestBuilder does nothing until .send() is called"]
pub struct RequestBuilder {
    service: BufferedService,
    max_body_size: usize,
    method: http::Method,
    url: String,
    headers: HeaderMap,
    body: BodyKind,
    /// First error met while building, reported by `send()`
    error: Option<HttpError>,
    transport_security: TransportSecurity,
}

impl RequestBuilder {
    pub(crate) fn new(
        service: BufferedService,
        max_body_size: usize,
        method: http::Method,
        url: String,
        transport_security: TransportSecurity,
    ) -> Self {
        Self {
            service,
            max_body_size,
            method,
            url,
            headers: HeaderMap::new(),
            body: BodyKind::Empty,
            error: None,
            transport_security,
        }
    }

    /// Sets a header from string parts, replacing any previous value.
    ///
    /// An invalid name or value is reported when the request is sent.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.error = Some(HttpError::InvalidHeaderName(e)),
            (_, Err(e)) => self.error = Some(HttpError::InvalidHeaderValue(e)),
        }
        self
    }

    /// Merges already validated headers, each replacing a previous value of the same name.
    pub fn header_map(mut self, headers: HeaderMap) -> Self {
        let mut last_name = None;
        for (name, value) in headers {
            // `HeaderMap::into_iter` yields `None` names for repeated values
            let Some(name) = name.or_else(|| last_name.clone()) else {
                continue;
            };
            self.headers.insert(name.clone(), value);
            last_name = Some(name);
        }
        self
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    /// Returns `HttpError::Json` if serialization fails, or an error deferred
    /// from an earlier builder call.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.body = BodyKind::Json(Bytes::from(serde_json::to_vec(body)?));
        Ok(self)
    }

    /// Serializes `fields` as an `application/x-www-form-urlencoded` body.
    ///
    /// # Errors
    /// Returns `HttpError::FormEncode` if `fields` is not a flat sequence of
    /// pairs or a flat struct, or an error deferred from an earlier builder call.
    pub fn form<T: Serialize + ?Sized>(mut self, fields: &T) -> Result<Self, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.body = BodyKind::Form(Bytes::from(serde_urlencoded::to_string(fields)?));
        Ok(self)
    }

    /// Uses an already encoded form string as the body.
    pub fn form_string(mut self, encoded: String) -> Self {
        self.body = BodyKind::Form(Bytes::from(encoded));
        self
    }

    /// Uses raw bytes as the body; no `Content-Type` is implied.
    pub fn body_bytes(mut self, body: Bytes) -> Self {
        self.body = BodyKind::Raw(body);
        self
    }

    fn validate_url(&self) -> Result<http::Uri, HttpError> {
        let uri: http::Uri =
            self.url
                .parse()
                .map_err(|e: http::uri::InvalidUri| HttpError::InvalidUri {
                    url: self.url.clone(),
                    kind: InvalidUriKind::ParseError,
                    reason: e.to_string(),
                })?;

        if uri.authority().is_none() {
            return Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingAuthority,
                reason: "missing host/authority".to_owned(),
            });
        }

        match uri.scheme_str() {
            Some("https") => Ok(uri),
            Some("http") => match self.transport_security {
                TransportSecurity::AllowInsecureHttp => Ok(uri),
                TransportSecurity::TlsOnly => Err(HttpError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "HTTPS required (transport security is TlsOnly)".to_owned(),
                }),
            },
            Some(scheme) => Err(HttpError::InvalidScheme {
                scheme: scheme.to_owned(),
                reason: "only http:// and https:// schemes are supported".to_owned(),
            }),
            None => Err(HttpError::InvalidUri {
                url: self.url.clone(),
                kind: InvalidUriKind::MissingScheme,
                reason: "missing scheme".to_owned(),
            }),
        }
    }

    /// Sends the request. Exactly one attempt is made.
    ///
    /// Any HTTP status, including 4xx and 5xx, is returned as `Ok`; use
    /// [`HttpResponse::error_for_status`] or [`HttpResponse::checked_bytes`]
    /// to turn it into an error.
    ///
    /// # Errors
    /// - a deferred builder error (invalid header name/value)
    /// - `InvalidUri` / `InvalidScheme` for a URL the transport refuses
    /// - `Timeout`, `Transport`, `Tls` when no response was obtained
    /// - `Overloaded` if the request buffer is full
    pub async fn send(mut self) -> Result<HttpResponse, HttpError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }

        let uri = self.validate_url()?;

        let (default_type, body) = match self.body {
            BodyKind::Empty => (None, Bytes::new()),
            BodyKind::Raw(b) => (None, b),
            BodyKind::Json(b) => (Some(JSON_CONTENT_TYPE), b),
            BodyKind::Form(b) => (Some(FORM_CONTENT_TYPE), b),
        };
        if let Some(content_type) = default_type {
            self.headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static(content_type));
        }

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(Full::new(body))?;
        *request.headers_mut() = self.headers;

        try_acquire_buffer_slot(&mut self.service).await?;

        let inner: Response<ResponseBody> =
            self.service.call(request).await.map_err(map_buffer_error)?;

        Ok(HttpResponse {
            inner,
            max_body_size: self.max_body_size,
        })
    }
}
