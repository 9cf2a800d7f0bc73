use crate::error::HttpError;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// Bytes of a failed response kept as `body_preview` of [`HttpError::HttpStatus`]
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;

const OVERSIZED_PREVIEW: &str = "<body too large for preview>";

/// Body type after the decompression layer, boxed so the client stack has
/// one nameable response type.
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// A received response whose body has not been read yet.
///
/// [`bytes`](Self::bytes) reads whatever came back. The other readers turn a
/// non-2xx status into [`HttpError::HttpStatus`] first. Every read stops at
/// the client's `max_body_size`.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) max_body_size: usize,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    #[must_use]
    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Fails on a non-2xx status without touching the body, so the preview
    /// is empty.
    ///
    /// # Errors
    /// [`HttpError::HttpStatus`] for any status outside 200..=299.
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        let status = self.status();
        if status.is_success() {
            Ok(self)
        } else {
            Err(HttpError::HttpStatus {
                status,
                body_preview: String::new(),
                content_type: content_type(self.headers()),
            })
        }
    }

    /// Whole body, whatever the status.
    ///
    /// # Errors
    /// [`HttpError::BodyTooLarge`] past the limit, [`HttpError::Transport`]
    /// when the connection drops mid-body.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        collect(self.inner, self.max_body_size).await
    }

    /// Whole body of a 2xx response.
    ///
    /// # Errors
    /// As [`bytes`](Self::bytes), plus [`HttpError::HttpStatus`] carrying a
    /// preview of the error body.
    pub async fn checked_bytes(self) -> Result<Bytes, HttpError> {
        let status = self.status();
        if status.is_success() {
            return collect(self.inner, self.max_body_size).await;
        }

        let content_type = content_type(self.headers());
        let limit = self.max_body_size.min(ERROR_BODY_PREVIEW_LIMIT);
        let body_preview = match collect(self.inner, limit).await {
            Ok(body) => String::from_utf8_lossy(&body).into_owned(),
            Err(HttpError::BodyTooLarge { .. }) => OVERSIZED_PREVIEW.to_owned(),
            Err(e) => return Err(e),
        };
        Err(HttpError::HttpStatus {
            status,
            body_preview,
            content_type,
        })
    }

    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes), plus [`HttpError::Json`].
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let body = self.checked_bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Lossy UTF-8 text of a 2xx response.
    ///
    /// # Errors
    /// As [`checked_bytes`](Self::checked_bytes).
    pub async fn text(self) -> Result<String, HttpError> {
        let body = self.checked_bytes().await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(http::header::CONTENT_TYPE)?
        .to_str()
        .ok()
        .map(str::to_owned)
}

async fn collect(response: Response<ResponseBody>, limit: usize) -> Result<Bytes, HttpError> {
    let mut body = std::pin::pin!(response.into_body());
    let mut buf = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        let Some(chunk) = frame.data_ref() else {
            continue;
        };
        let actual = buf.len() + chunk.len();
        if actual > limit {
            return Err(HttpError::BodyTooLarge { limit, actual });
        }
        buf.extend_from_slice(chunk);
    }

    Ok(buf.freeze())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn canned(status: u16, body: &'static str, limit: usize) -> HttpResponse {
        let body: ResponseBody = Full::new(Bytes::from_static(body.as_bytes()))
            .map_err(|never| match never {})
            .boxed();
        HttpResponse {
            inner: Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
            max_body_size: limit,
        }
    }

    #[tokio::test]
    async fn bytes_returns_error_bodies_too() {
        let body = canned(500, "boom", 1024).bytes().await.unwrap();
        assert_eq!(&body[..], b"boom");
    }

    #[tokio::test]
    async fn validation_error_keeps_body_and_content_type() {
        let err = canned(422, r#"{"detail":"title required"}"#, 1024)
            .checked_bytes()
            .await
            .unwrap_err();
        match err {
            HttpError::HttpStatus {
                status,
                body_preview,
                content_type,
            } => {
                assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
                assert!(body_preview.contains("title required"));
                assert_eq!(content_type.as_deref(), Some("application/json"));
            }
            other => panic!("expected HttpStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_error_body_still_reports_status() {
        let err = canned(500, "0123456789", 4).checked_bytes().await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::HttpStatus { ref body_preview, .. } if body_preview == OVERSIZED_PREVIEW
        ));
    }

    #[tokio::test]
    async fn success_body_over_limit_fails() {
        let err = canned(200, "0123456789", 4).bytes().await.unwrap_err();
        assert!(matches!(
            err,
            HttpError::BodyTooLarge {
                limit: 4,
                actual: 10
            }
        ));
    }

    #[tokio::test]
    async fn no_content_passes_status_check() {
        let resp = canned(204, "", 16).error_for_status().unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(resp.max_body_size(), 16);
    }

    #[tokio::test]
    async fn json_and_text_readers() {
        let todo: serde_json::Value = canned(200, r#"{"id":1}"#, 64).json().await.unwrap();
        assert_eq!(todo["id"], 1);
        assert_eq!(canned(200, "hello", 16).text().await.unwrap(), "hello");
    }
}
