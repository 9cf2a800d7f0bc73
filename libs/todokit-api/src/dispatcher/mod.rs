//! Request dispatcher
//!
//! [`ApiClient::execute`] turns a typed [`RequestOptions`] into exactly one
//! HTTP call and the response into `E::Response` or a [`ClientError`].

mod decode;
mod encode;
mod headers;
mod options;
mod path;

pub use options::{DynamicOptions, RequestOptions};

pub(crate) use headers::bearer;

use crate::config::ApiClientConfig;
use crate::error::{ApiError, ClientError, ConfigurationError};
use crate::registry::{BodyEncoding, Endpoint, EndpointDescriptor, EndpointName, PathParams};
use arc_swap::ArcSwapOption;
use bytes::Bytes;
use encode::{Encoded, Input};
use http::HeaderMap;
use options::Payload;
use secrecy::SecretString;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use todokit_http::{HttpClient, TransportSecurity};
use url::{Host, Url};

/// Typed client for the todokit backend.
///
/// Owns its transport (with its cookie jar) and an optional bearer
/// credential. Calls may run concurrently; a credential change applies to
/// calls started after it.
///
/// ```no_run
/// use todokit_api::{ApiClient, RequestOptions, TodoGetOne, TodoId};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ApiClient::new("http://localhost:8000/api/v1")?;
/// client.set_credential("token-from-sign-in");
///
/// let todo = client
///     .execute(RequestOptions::<TodoGetOne>::new().path(TodoId { todo_id: 3 }))
///     .await?;
/// println!("{}", todo.item);
/// # Ok(())
/// # }
/// ```
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
    credential: ArcSwapOption<SecretString>,
}

impl ApiClient {
    /// Client for `base_url` with default settings.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// See [`ApiClient::from_config`].
    pub fn new(base_url: impl Into<String>) -> Result<Self, ConfigurationError> {
        Self::from_config(&ApiClientConfig {
            base_url: base_url.into(),
            ..ApiClientConfig::default()
        })
    }

    /// Builds the transport from `config` and arms its initial token.
    ///
    /// Plain `http://` is accepted for loopback hosts, or for any host when
    /// `allow_insecure_http` is set. Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// `ConfigurationError::InvalidConfig` if the base URL does not parse,
    /// uses another scheme, needs `allow_insecure_http`, or the transport
    /// cannot be built.
    pub fn from_config(config: &ApiClientConfig) -> Result<Self, ConfigurationError> {
        let url = Url::parse(&config.base_url).map_err(|e| {
            ConfigurationError::InvalidConfig(format!("base_url `{}`: {e}", config.base_url))
        })?;

        let transport = match url.scheme() {
            "https" => TransportSecurity::TlsOnly,
            "http" if config.allow_insecure_http || is_loopback(&url) => {
                TransportSecurity::AllowInsecureHttp
            }
            "http" => {
                return Err(ConfigurationError::InvalidConfig(format!(
                    "base_url `{}` uses plain http for a non-loopback host; set allow_insecure_http to permit it",
                    config.base_url
                )));
            }
            other => {
                return Err(ConfigurationError::InvalidConfig(format!(
                    "base_url scheme `{other}` is not supported"
                )));
            }
        };

        let http = HttpClient::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .transport(transport)
            .cookies(config.cookies)
            .build()
            .map_err(|e| ConfigurationError::InvalidConfig(e.to_string()))?;

        let client = Self::with_http_client(http, config.base_url.clone());
        if let Some(token) = &config.token {
            client.set_credential(token.clone());
        }
        Ok(client)
    }

    /// Wraps an already built transport.
    #[must_use]
    pub fn with_http_client(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            credential: ArcSwapOption::empty(),
        }
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn http_client(&self) -> &HttpClient {
        &self.http
    }

    /// Sends `Authorization: Bearer <token>` on later calls. An empty token clears it.
    pub fn set_credential(&self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            self.clear_credential();
            return;
        }
        self.credential
            .store(Some(Arc::new(SecretString::from(token))));
    }

    pub fn clear_credential(&self) {
        self.credential.store(None);
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential.load().is_some()
    }

    pub(crate) fn credential(&self) -> Option<Arc<SecretString>> {
        self.credential.load_full()
    }

    /// Calls endpoint `E`.
    ///
    /// # Errors
    /// - `ClientError::Configuration` for a missing path parameter, an
    ///   invalid header or a payload that cannot be encoded; nothing is sent
    /// - `ClientError::Api` with status 0 when no response arrived
    /// - `ClientError::Api` with the response status for a non-2xx answer or
    ///   a 2xx body that does not decode into `E::Response`
    pub async fn execute<E: Endpoint>(
        &self,
        options: RequestOptions<E>,
    ) -> Result<E::Response, ClientError> {
        let RequestOptions {
            path: params,
            body,
            headers,
            error,
        } = options;
        if let Some(e) = error {
            return Err(e.into());
        }

        let descriptor = &E::DESCRIPTOR;
        let resolved = path::resolve(descriptor, |name| {
            params.as_ref().and_then(|p| p.value(name))
        })?;

        let input = match body {
            None => None,
            Some(Payload::Typed(request)) => {
                Some(Input::Value(encode::to_value(descriptor, &request)?))
            }
            Some(Payload::RawForm(raw)) => Some(Input::RawForm(raw)),
        };

        let (status, bytes) = self.send(descriptor, &resolved, input, headers).await?;
        Ok(decode::success(status, &bytes)?)
    }

    /// Calls the endpoint registered under the wire name `name`.
    ///
    /// Returns `None` when the server answers without content.
    ///
    /// # Errors
    /// As [`execute`](Self::execute), plus `ConfigurationError` for an unknown
    /// name, an undeclared or mistyped path parameter, or a body sent to an
    /// endpoint that takes none.
    pub async fn execute_dynamic(
        &self,
        name: &str,
        options: DynamicOptions,
    ) -> Result<Option<Value>, ClientError> {
        let descriptor = name.parse::<EndpointName>()?.descriptor();
        let DynamicOptions {
            path: params,
            body,
            headers,
        } = options;

        for (key, value) in &params {
            let spec = descriptor.path_param(key).ok_or_else(|| {
                ConfigurationError::UnknownPathParam {
                    endpoint: descriptor.name,
                    param: key.clone(),
                }
            })?;
            if !value.is_null() && !spec.kind.accepts(value) {
                return Err(ConfigurationError::PathParamKind {
                    endpoint: descriptor.name,
                    param: spec.name,
                    expected: spec.kind,
                }
                .into());
            }
        }

        let resolved = path::resolve(descriptor, |name| match params.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })?;

        let body = body.filter(|b| !b.is_null());
        if body.is_some() && !descriptor.has_request() {
            return Err(ConfigurationError::UnexpectedBody {
                endpoint: descriptor.name,
            }
            .into());
        }

        let (status, bytes) = self
            .send(descriptor, &resolved, body.map(Input::Value), headers)
            .await?;
        Ok(decode::success(status, &bytes)?)
    }

    async fn send(
        &self,
        descriptor: &EndpointDescriptor,
        path: &str,
        input: Option<Input>,
        caller_headers: HeaderMap,
    ) -> Result<(u16, Bytes), ClientError> {
        let encoded = encode::encode(descriptor, input)?;
        let form = descriptor.encoding == BodyEncoding::Form || matches!(encoded, Encoded::Form(_));
        let credential = self.credential();
        let headers = headers::compose(form, credential.as_deref(), caller_headers)?;

        let mut url = format!("{}{path}", self.base_url);
        if let Encoded::Query(query) = &encoded {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(query);
        }

        tracing::debug!(
            endpoint = descriptor.name,
            method = %descriptor.method,
            path,
            authenticated = credential.is_some(),
            "dispatching request"
        );

        let builder = self
            .http
            .request(descriptor.method.into(), &url)
            .header_map(headers);
        let builder = match encoded {
            Encoded::Json(bytes) => builder.body_bytes(bytes),
            Encoded::Form(form) => builder.form_string(form),
            Encoded::Nothing | Encoded::Query(_) => builder,
        };

        let response = builder.send().await.map_err(|e| {
            tracing::debug!(endpoint = descriptor.name, error = %e, "no response");
            ApiError::transport(e)
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            tracing::debug!(endpoint = descriptor.name, status, error = %e, "failed to read body");
            if e.is_transport() {
                ApiError::transport(e)
            } else {
                ApiError::unreadable(status, e)
            }
        })?;

        if !(200..300).contains(&status) {
            tracing::debug!(endpoint = descriptor.name, status, "request rejected");
            return Err(ApiError::from_response(status, decode::payload(&bytes)).into());
        }

        tracing::debug!(endpoint = descriptor.name, status, "request succeeded");
        Ok((status, bytes))
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("has_credential", &self.has_credential())
            .finish_non_exhaustive()
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn base_url_loses_trailing_slash() {
        let client = ApiClient::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn plain_http_needs_loopback_or_opt_in() {
        assert!(ApiClient::new("http://127.0.0.1:9/api").is_ok());
        assert!(ApiClient::new("http://[::1]:9/api").is_ok());
        assert!(ApiClient::new("https://todo.example.com/api").is_ok());

        let err = ApiClient::new("http://todo.example.com/api").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidConfig(_)));

        let opted_in = ApiClient::from_config(&ApiClientConfig {
            base_url: "http://todo.example.com/api".to_owned(),
            allow_insecure_http: true,
            ..ApiClientConfig::default()
        });
        assert!(opted_in.is_ok());
    }

    #[tokio::test]
    async fn rejects_unparsable_and_foreign_urls() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ConfigurationError::InvalidConfig(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://localhost/api"),
            Err(ConfigurationError::InvalidConfig(ref m)) if m.contains("ftp")
        ));
    }

    #[tokio::test]
    async fn credential_lifecycle() {
        let client = ApiClient::from_config(&ApiClientConfig {
            token: Some("initial".to_owned()),
            ..ApiClientConfig::default()
        })
        .unwrap();
        assert!(client.has_credential());

        client.clear_credential();
        assert!(!client.has_credential());

        client.set_credential("next");
        assert!(client.has_credential());
        client.set_credential("");
        assert!(!client.has_credential());
    }

    #[tokio::test]
    async fn debug_output_hides_token() {
        let client = ApiClient::new("http://localhost:8000").unwrap();
        client.set_credential("s3cr3t");
        let debug = format!("{client:?}");
        assert!(!debug.contains("s3cr3t"));
        assert!(debug.contains("has_credential: true"));
    }
}
