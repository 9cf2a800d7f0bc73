use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;

/// Tower layer that wraps each outgoing request in a `tracing` span
///
/// The span is named `http_request` and carries:
/// - `http.method`: the HTTP method
/// - `http.url`: scheme, authority and path (the query string is left out)
/// - `http.status_code`: recorded once a response arrives
///
/// Spans and events are emitted at `DEBUG`, so the transport stays silent
/// under the default `info` filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct TraceLayer;

impl TraceLayer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TraceService { inner }
    }
}

/// Service produced by [`TraceLayer`]
#[derive(Clone)]
pub struct TraceService<S> {
    inner: S,
}

/// URL without the query string; query values may carry credentials.
fn redacted_url(uri: &http::Uri) -> String {
    format!(
        "{}://{}{}",
        uri.scheme_str().unwrap_or("https"),
        uri.authority().map_or("", http::uri::Authority::as_str),
        uri.path()
    )
}

impl<S, ResBody> Service<Request<Full<Bytes>>> for TraceService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: std::fmt::Display + Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        let span = tracing::debug_span!(
            "http_request",
            http.method = %req.method(),
            http.url = %redacted_url(req.uri()),
            http.status_code = tracing::field::Empty,
        );

        // Call the instance that was poll_ready'd and keep a fresh clone for next time
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let result = inner.call(req).instrument(span.clone()).await;
            match &result {
                Ok(response) => {
                    span.record("http.status_code", response.status().as_u16());
                    tracing::debug!(parent: &span, status = response.status().as_u16(), "response received");
                }
                Err(e) => {
                    tracing::debug!(parent: &span, error = %e, "request failed");
                }
            }
            result
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::StatusCode;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct Echo;

    impl Service<Request<Full<Bytes>>> for Echo {
        type Response = Response<Full<Bytes>>;
        type Error = String;
        type Future = std::future::Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
            let status = if req.uri().path() == "/missing" {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::OK
            };
            std::future::ready(Ok(Response::builder()
                .status(status)
                .body(Full::new(Bytes::new()))
                .unwrap()))
        }
    }

    #[test]
    fn test_redacted_url_drops_query() {
        let uri: http::Uri = "http://localhost:8000/api/v1/user/?skip=0&token=abc"
            .parse()
            .unwrap();
        assert_eq!(redacted_url(&uri), "http://localhost:8000/api/v1/user/");
    }

    #[tokio::test]
    async fn test_trace_service_passes_response_through() {
        let mut service = TraceLayer::new().layer(Echo);
        let req = Request::builder()
            .uri("http://localhost/missing")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let resp = service.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
