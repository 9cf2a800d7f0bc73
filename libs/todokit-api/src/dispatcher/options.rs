use crate::error::ConfigurationError;
use crate::registry::{Endpoint, HasRequest};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value};

pub(crate) enum Payload<R> {
    Typed(R),
    RawForm(String),
}

/// Inputs of one typed call to endpoint `E`.
///
/// Only what `E` declares can be set: path parameters of type
/// `E::PathParams`, and a body of type `E::Request` when `E` takes one.
///
/// `todoCreate` takes a `TodoForm`:
///
/// ```
/// use todokit_api::{RequestOptions, TodoCreate, TodoForm};
///
/// let _ = RequestOptions::<TodoCreate>::new().body(TodoForm::new("milk"));
/// ```
///
/// The same call on `todoGetAll`, which takes no payload, does not compile:
///
/// ```compile_fail,E0599
/// use todokit_api::{RequestOptions, TodoForm, TodoGetAll};
///
/// let _ = RequestOptions::<TodoGetAll>::new().body(TodoForm::new("milk"));
/// ```
///
/// `todoGetOne` is addressed by a `TodoId`:
///
/// ```
/// use todokit_api::{RequestOptions, TodoGetOne, TodoId};
///
/// let _ = RequestOptions::<TodoGetOne>::new().path(TodoId { todo_id: 42 });
/// ```
///
/// and an `ItemId` is refused:
///
/// ```compile_fail,E0308
/// use todokit_api::{ItemId, RequestOptions, TodoGetOne};
///
/// let _ = RequestOptions::<TodoGetOne>::new().path(ItemId::new("42"));
/// ```
#[must_use]
pub struct RequestOptions<E: Endpoint> {
    pub(crate) path: Option<E::PathParams>,
    pub(crate) body: Option<Payload<E::Request>>,
    pub(crate) headers: HeaderMap,
    /// First invalid header, reported by `execute`
    pub(crate) error: Option<ConfigurationError>,
}

impl<E: Endpoint> Default for RequestOptions<E> {
    fn default() -> Self {
        Self {
            path: None,
            body: None,
            headers: HeaderMap::new(),
            error: None,
        }
    }
}

impl<E: Endpoint> RequestOptions<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, params: E::PathParams) -> Self {
        self.path = Some(params);
        self
    }

    /// Adds a header; it replaces any default of the same name.
    ///
    /// An invalid name or value surfaces as
    /// [`ConfigurationError::InvalidHeader`] from `execute`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => {
                self.error = Some(ConfigurationError::InvalidHeader(format!("{name}: {e}")));
            }
            (_, Err(e)) => {
                self.error = Some(ConfigurationError::InvalidHeader(format!("{name}: {e}")));
            }
        }
        self
    }

    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

impl<E: HasRequest> RequestOptions<E> {
    /// Sets the payload: the query for GET and DELETE, the body otherwise.
    pub fn body(mut self, body: E::Request) -> Self {
        self.body = Some(Payload::Typed(body));
        self
    }

    /// Sends an already form-encoded payload as is.
    pub fn raw_form(mut self, encoded: impl Into<String>) -> Self {
        self.body = Some(Payload::RawForm(encoded.into()));
        self
    }
}

/// Inputs of a call picked by wire name at runtime
#[derive(Debug, Clone, Default)]
pub struct DynamicOptions {
    /// Placeholder values; each must match the declared kind
    pub path: Map<String, Value>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
}

impl DynamicOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.path.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::registry::{TodoCreate, TodoForm};

    #[test]
    fn invalid_header_is_deferred() {
        let options = RequestOptions::<TodoCreate>::new()
            .header("bad header", "x")
            .header("x-ok", "1");
        assert!(matches!(
            options.error,
            Some(ConfigurationError::InvalidHeader(ref m)) if m.starts_with("bad header")
        ));
        assert!(options.headers.is_empty());
    }

    #[test]
    fn later_header_replaces_earlier() {
        let options = RequestOptions::<TodoCreate>::new()
            .header("x-trace", "a")
            .header("x-trace", "b")
            .body(TodoForm::new("milk"));
        assert_eq!(options.headers["x-trace"], "b");
        assert!(matches!(options.body, Some(Payload::Typed(ref f)) if f.item == "milk"));
    }
}
