use crate::builder::HttpClientBuilder;
use crate::config::TransportSecurity;
use crate::error::HttpError;
use crate::layers::CookieJar;
use crate::request::RequestBuilder;
use crate::response::ResponseBody;
use bytes::Bytes;
use http::{Method, Request, Response};
use http_body_util::Full;
use std::future::Future;
use std::pin::Pin;
use tower::Service;
use tower::buffer::Buffer;

/// Future type of the type-erased service stack
pub type ServiceFuture =
    Pin<Box<dyn Future<Output = Result<Response<ResponseBody>, HttpError>> + Send>>;

/// The service stack behind a `tower::buffer::Buffer`
pub type BufferedService = Buffer<Request<Full<Bytes>>, ServiceFuture>;

/// HTTP client over a tower middleware stack
///
/// `HttpClient` is `Clone + Send + Sync`; a clone shares the connection pool,
/// the request buffer and the cookie jar with the original. Separately built
/// clients share nothing.
///
/// Use [`HttpClientBuilder`] to configure it.
#[derive(Clone)]
pub struct HttpClient {
    pub(crate) service: BufferedService,
    pub(crate) max_body_size: usize,
    pub(crate) transport_security: TransportSecurity,
    pub(crate) cookie_jar: Option<CookieJar>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_body_size", &self.max_body_size)
            .field("transport_security", &self.transport_security)
            .field("cookies", &self.cookie_jar.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client with the default configuration
    ///
    /// # Errors
    /// Returns an error if TLS initialization fails
    pub fn new() -> Result<Self, HttpError> {
        HttpClientBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// The cookie jar, when cookies are enabled
    #[must_use]
    pub fn cookie_jar(&self) -> Option<&CookieJar> {
        self.cookie_jar.as_ref()
    }

    /// Request builder for an arbitrary method
    ///
    /// `url` must be absolute (scheme and host). `http://` URLs are refused
    /// unless the client was built with [`TransportSecurity::AllowInsecureHttp`].
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(
            self.service.clone(),
            self.max_body_size,
            method,
            url.to_owned(),
            self.transport_security,
        )
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }
}

/// Map buffer errors to `HttpError`
///
/// The buffer hands back the inner service's error boxed, or its own error
/// when the worker is gone.
pub fn map_buffer_error(err: tower::BoxError) -> HttpError {
    match err.downcast::<HttpError>() {
        Ok(http_err) => *http_err,
        Err(err) => {
            tracing::error!(
                error = %err,
                "buffer worker closed unexpectedly; service unavailable"
            );
            HttpError::ServiceClosed
        }
    }
}

/// Polls the buffer once; a full buffer yields `HttpError::Overloaded`
/// instead of waiting.
pub async fn try_acquire_buffer_slot(service: &mut BufferedService) -> Result<(), HttpError> {
    use std::task::Poll;

    let poll_result = std::future::poll_fn(|cx| match service.poll_ready(cx) {
        Poll::Ready(result) => Poll::Ready(Some(result)),
        Poll::Pending => Poll::Ready(None),
    })
    .await;

    match poll_result {
        Some(Ok(())) => Ok(()),
        Some(Err(e)) => Err(map_buffer_error(e)),
        None => Err(HttpError::Overloaded),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn test_client() -> HttpClient {
        HttpClientBuilder::new().allow_insecure_http().build().unwrap()
    }

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Todo {
        id: i64,
        item: String,
    }

    #[tokio::test]
    async fn test_get_json() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/api/v1/todo/");
            then.status(200)
                .json_body(json!([{"id": 1, "item": "milk"}, {"id": 2, "item": "eggs"}]));
        });

        let todos: Vec<Todo> = test_client()
            .get(&server.url("/api/v1/todo/"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(todos.len(), 2);
        assert_eq!(todos[1].item, "eggs");
    }

    #[tokio::test]
    async fn test_every_method_reaches_server() {
        let server = MockServer::start();
        let client = test_client();

        for (method, mock_method) in [
            (http::Method::PUT, PUT),
            (http::Method::PATCH, PATCH),
            (http::Method::DELETE, DELETE),
            (http::Method::OPTIONS, OPTIONS),
            (http::Method::TRACE, httpmock::Method::TRACE),
        ] {
            let m = server.mock(|when, then| {
                when.method(mock_method).path("/items/1");
                then.status(204);
            });
            let resp = client
                .request(method, &server.url("/items/1"))
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), http::StatusCode::NO_CONTENT);
            m.assert();
        }
    }

    #[tokio::test]
    async fn test_json_body_sets_content_type() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/todo/")
                .header("content-type", "application/json")
                .json_body(json!({"item": "milk"}));
            then.status(200).json_body(json!({"id": 3, "item": "milk"}));
        });

        let todo: Todo = test_client()
            .post(&server.url("/api/v1/todo/"))
            .json(&json!({"item": "milk"}))
            .unwrap()
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(todo, Todo { id: 3, item: "milk".to_owned() });
        m.assert();
    }

    #[tokio::test]
    async fn test_form_body() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/auths/signin")
                .header("content-type", "application/x-www-form-urlencoded")
                .body("email=a%40b.com&password=x");
            then.status(200);
        });

        test_client()
            .post(&server.url("/auths/signin"))
            .form(&[("email", "a@b.com"), ("password", "x")])
            .unwrap()
            .send()
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn test_explicit_content_type_wins() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/raw")
                .header("content-type", "text/plain")
                .body("a=b");
            then.status(200);
        });

        test_client()
            .post(&server.url("/raw"))
            .header("content-type", "text/plain")
            .form_string("a=b".to_owned())
            .send()
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn test_header_map_replaces_earlier_header() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET)
                .path("/h")
                .header("accept", "text/csv")
                .header("x-request-id", "42");
            then.status(200);
        });

        let mut extra = http::HeaderMap::new();
        extra.insert("accept", http::HeaderValue::from_static("text/csv"));
        extra.insert("x-request-id", http::HeaderValue::from_static("42"));

        test_client()
            .get(&server.url("/h"))
            .header("accept", "application/json")
            .header_map(extra)
            .send()
            .await
            .unwrap();
        m.assert();
    }

    #[tokio::test]
    async fn test_invalid_header_deferred_to_send() {
        let result = test_client()
            .get("http://localhost:1/x")
            .header("bad header", "v")
            .send()
            .await;
        assert!(matches!(result, Err(HttpError::InvalidHeaderName(_))));
    }

    #[tokio::test]
    async fn test_non_2xx_is_ok_until_checked() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/api/v1/todo/99");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"detail": "Todo not found"}));
        });

        let resp = test_client()
            .get(&server.url("/api/v1/todo/99"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);

        match resp.checked_bytes().await {
            Err(HttpError::HttpStatus {
                status,
                body_preview,
                ..
            }) => {
                assert_eq!(status, http::StatusCode::NOT_FOUND);
                assert!(body_preview.contains("Todo not found"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503);
        });

        let resp = test_client()
            .get(&server.url("/flaky"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::SERVICE_UNAVAILABLE);
        m.assert_calls(1);
    }

    #[tokio::test]
    async fn test_redirect_not_followed() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/old");
            then.status(307).header("location", "/new");
        });

        let resp = test_client().get(&server.url("/old")).send().await.unwrap();
        assert_eq!(resp.status(), http::StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(GET).path("/slow");
            then.status(200).delay(Duration::from_secs(2));
        });

        let client = HttpClientBuilder::new()
            .allow_insecure_http()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let result = client.get(&server.url("/slow")).send().await;
        match result {
            Err(err @ HttpError::Timeout(_)) => assert!(err.is_transport()),
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport() {
        // Nothing listens on port 1
        let err = test_client()
            .get("http://127.0.0.1:1/api/v1/todo/")
            .send()
            .await
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn test_session_cookie_replayed() {
        let server = MockServer::start();
        let signin = server.mock(|when, then| {
            when.method(POST).path("/api/v1/auths/signin");
            then.status(200)
                .header("set-cookie", "token=abc; Path=/; HttpOnly")
                .json_body(json!({"token": "abc"}));
        });
        let todos = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/todo/")
                .header("cookie", "token=abc");
            then.status(200).json_body(json!([]));
        });

        let client = test_client();
        client
            .post(&server.url("/api/v1/auths/signin"))
            .send()
            .await
            .unwrap();

        // A clone shares the jar
        let resp = client
            .clone()
            .get(&server.url("/api/v1/todo/"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), http::StatusCode::OK);
        signin.assert();
        todos.assert();

        let authority = format!("{}:{}", server.host(), server.port());
        let jar = client.cookie_jar().unwrap();
        assert_eq!(jar.get(&authority, "token").as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_cookies_disabled_not_stored() {
        let server = MockServer::start();
        let _m = server.mock(|when, then| {
            when.method(POST).path("/signin");
            then.status(200).header("set-cookie", "token=abc");
        });

        let client = HttpClientBuilder::new()
            .allow_insecure_http()
            .cookies(false)
            .build()
            .unwrap();
        client.post(&server.url("/signin")).send().await.unwrap();
        assert!(client.cookie_jar().is_none());
    }

    fn gzip_compress(data: &[u8]) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[tokio::test]
    async fn test_gzip_json_decompressed() {
        let server = MockServer::start();
        let compressed = gzip_compress(br#"[{"id":1,"item":"milk"}]"#);
        let _m = server.mock(|when, then| {
            when.method(GET).path("/gz");
            then.status(200)
                .header("content-type", "application/json")
                .header("content-encoding", "gzip")
                .body(compressed);
        });

        let todos: Vec<Todo> = test_client()
            .get(&server.url("/gz"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(todos, vec![Todo { id: 1, item: "milk".to_owned() }]);
    }

    #[tokio::test]
    async fn test_body_limit_applies_after_decompression() {
        let server = MockServer::start();
        let compressed = gzip_compress(&vec![b'x'; 64 * 1024]);
        assert!(compressed.len() < 1024);
        let _m = server.mock(|when, then| {
            when.method(GET).path("/bomb");
            then.status(200)
                .header("content-encoding", "gzip")
                .body(compressed);
        });

        let client = HttpClientBuilder::new()
            .allow_insecure_http()
            .max_body_size(1024)
            .build()
            .unwrap();
        let result = client.get(&server.url("/bomb")).send().await.unwrap().bytes().await;
        assert!(matches!(result, Err(HttpError::BodyTooLarge { .. })));
    }

    #[tokio::test]
    async fn test_http_rejected_with_tls_only() {
        let client = HttpClientBuilder::new().build().unwrap();
        match client.get("http://localhost:8000/api/v1/todo/").send().await {
            Err(HttpError::InvalidScheme { scheme, reason }) => {
                assert_eq!(scheme, "http");
                assert!(reason.contains("TlsOnly"));
            }
            other => panic!("expected InvalidScheme, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relative_and_unknown_scheme_rejected() {
        let client = test_client();
        assert!(matches!(
            client.get("/api/v1/todo/").send().await,
            Err(HttpError::InvalidUri {
                kind: crate::InvalidUriKind::MissingAuthority,
                ..
            })
        ));
        assert!(matches!(
            client.get("ftp://example.com/file").send().await,
            Err(HttpError::InvalidScheme { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/api/v1/todo/");
            then.status(200).json_body(json!([]));
        });

        let client = test_client();
        let url = server.url("/api/v1/todo/");
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let client = client.clone();
                let url = url.clone();
                tokio::spawn(async move { client.get(&url).send().await })
            })
            .collect();
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        m.assert_calls(20);
    }

    #[test]
    fn test_map_buffer_error_passes_through_http_error() {
        let err: tower::BoxError = Box::new(HttpError::Timeout(Duration::from_secs(1)));
        assert!(matches!(map_buffer_error(err), HttpError::Timeout(_)));
    }

    #[test]
    fn test_map_buffer_error_unknown_is_service_closed() {
        let err: tower::BoxError = "worker gone".into();
        assert!(matches!(map_buffer_error(err), HttpError::ServiceClosed));
    }

    #[test]
    fn test_http_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HttpClient>();
    }
}
