use std::time::Duration;

/// `User-Agent` sent when the caller does not pick one
pub const DEFAULT_USER_AGENT: &str = concat!("todokit-http/", env!("CARGO_PKG_VERSION"));

const MIB: usize = 1024 * 1024;

/// Which URL schemes the client will talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// `https://` only
    #[default]
    TlsOnly,
    /// `http://` as well. Bearer tokens and session cookies then cross the
    /// network in clear text.
    AllowInsecureHttp,
}

/// Knobs of an [`HttpClient`](crate::HttpClient), consumed by
/// [`HttpClientBuilder`](crate::HttpClientBuilder)
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Upper bound for one request, connect to last body byte
    pub request_timeout: Duration,

    /// Largest accepted response body, measured after decompression
    pub max_body_size: usize,

    pub user_agent: String,

    pub transport: TransportSecurity,

    /// Keep `Set-Cookie` values and replay them to the same host.
    ///
    /// Clones of a client share one jar; separately built clients do not.
    pub cookies: bool,

    /// Requests that may wait for the dispatch worker before callers get
    /// [`HttpError::Overloaded`](crate::HttpError::Overloaded)
    pub buffer_capacity: usize,

    /// `None` keeps hyper-util's own idle timeout
    pub pool_idle_timeout: Option<Duration>,

    /// `0` disables connection reuse
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_body_size: 10 * MIB,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            cookies: true,
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Short timeout, small pool and no cookie jar, for one-shot tools.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: MIB,
            cookies: false,
            buffer_capacity: 256,
            pool_idle_timeout: Some(Duration::from_secs(30)),
            pool_max_idle_per_host: 8,
            ..Self::default()
        }
    }

    /// Like [`minimal`](Self::minimal) but with cookies and plain `http://`,
    /// for tests against a local mock server.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            transport: TransportSecurity::AllowInsecureHttp,
            cookies: true,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            ..Self::minimal()
        }
    }
}
