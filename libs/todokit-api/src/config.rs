use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Settings for an [`ApiClient`](crate::ApiClient)
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiClientConfig {
    /// Backend root, e.g. `https://todo.example.com/api/v1`; a trailing slash is dropped
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token armed at construction
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Allow `http://` for hosts other than loopback.
    #[serde(default)]
    pub allow_insecure_http: bool,

    /// Keep and replay cookies set by the backend
    #[serde(default = "default_cookies")]
    pub cookies: bool,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
            allow_insecure_http: false,
            cookies: default_cookies(),
        }
    }
}

impl ApiClientConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for ApiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("allow_insecure_http", &self.allow_insecure_http)
            .field("cookies", &self.cookies)
            .finish()
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api/v1".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("todokit/", env!("CARGO_PKG_VERSION")).to_owned()
}

fn default_cookies() -> bool {
    true
}
