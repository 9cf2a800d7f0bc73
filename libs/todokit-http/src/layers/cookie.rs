use http::{HeaderMap, HeaderValue, Request, Response};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

/// Cookie storage keyed by request authority (`host[:port]`)
///
/// Only name and value are kept. `Path`, `Domain` and `Secure` attributes are
/// not interpreted: a cookie set by a host is sent back on every request to
/// that same host. A cookie is dropped when the server resets it with an
/// empty value or a non-positive `Max-Age`.
///
/// Cloning the jar yields a handle to the same storage.
#[derive(Clone, Debug, Default)]
pub struct CookieJar {
    hosts: Arc<RwLock<HashMap<String, BTreeMap<String, String>>>>,
}

impl CookieJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every `Set-Cookie` header in `headers` to the cookies of `authority`.
    pub fn store(&self, authority: &str, headers: &HeaderMap) {
        let mut parsed = headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(parse_set_cookie)
            .peekable();
        if parsed.peek().is_none() {
            return;
        }

        let mut hosts = self.hosts.write();
        let cookies = hosts.entry(authority.to_owned()).or_default();
        for cookie in parsed {
            match cookie {
                SetCookie::Keep { name, value } => {
                    tracing::trace!(authority, cookie = %name, "cookie stored");
                    cookies.insert(name, value);
                }
                SetCookie::Remove { name } => {
                    tracing::trace!(authority, cookie = %name, "cookie removed");
                    cookies.remove(&name);
                }
            }
        }
        if cookies.is_empty() {
            hosts.remove(authority);
        }
    }

    /// Value of a single cookie stored for `authority`.
    #[must_use]
    pub fn get(&self, authority: &str, name: &str) -> Option<String> {
        self.hosts.read().get(authority)?.get(name).cloned()
    }

    /// `Cookie` request header for `authority`, if anything is stored.
    #[must_use]
    pub fn header_for(&self, authority: &str) -> Option<HeaderValue> {
        let hosts = self.hosts.read();
        let cookies = hosts.get(authority)?;
        let joined = cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&joined).ok()
    }

    /// Forgets every stored cookie.
    pub fn clear(&self) {
        self.hosts.write().clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.read().is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SetCookie {
    Keep { name: String, value: String },
    Remove { name: String },
}

fn parse_set_cookie(raw: &str) -> Option<SetCookie> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"');

    let expired = parts.filter_map(|attr| attr.split_once('=')).any(|(k, v)| {
        k.trim().eq_ignore_ascii_case("max-age") && v.trim().parse::<i64>().is_ok_and(|age| age <= 0)
    });

    if expired || value.is_empty() {
        Some(SetCookie::Remove {
            name: name.to_owned(),
        })
    } else {
        Some(SetCookie::Keep {
            name: name.to_owned(),
            value: value.to_owned(),
        })
    }
}

/// Tower layer that attaches a [`CookieJar`] to the wrapped service
#[derive(Clone, Debug)]
pub struct CookieJarLayer {
    jar: CookieJar,
}

impl CookieJarLayer {
    #[must_use]
    pub fn new(jar: CookieJar) -> Self {
        Self { jar }
    }
}

impl<S> Layer<S> for CookieJarLayer {
    type Service = CookieJarService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CookieJarService {
            inner,
            jar: self.jar.clone(),
        }
    }
}

/// Service produced by [`CookieJarLayer`]
///
/// A `Cookie` header set explicitly by the caller is left untouched.
#[derive(Clone)]
pub struct CookieJarService<S> {
    inner: S,
    jar: CookieJar,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CookieJarService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        let authority = req
            .uri()
            .authority()
            .map(|a| a.as_str().to_owned())
            .unwrap_or_default();

        if !req.headers().contains_key(http::header::COOKIE)
            && let Some(cookie) = self.jar.header_for(&authority)
        {
            req.headers_mut().insert(http::header::COOKIE, cookie);
        }

        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let jar = self.jar.clone();

        Box::pin(async move {
            let response = inner.call(req).await?;
            jar.store(&authority, response.headers());
            Ok(response)
        })
    }
}
