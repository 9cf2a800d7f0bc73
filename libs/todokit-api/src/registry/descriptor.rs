use std::fmt;

/// HTTP verbs an endpoint can be registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }

    /// GET and DELETE carry their input in the query string; every other
    /// verb carries it in the body.
    #[must_use]
    pub const fn uses_query(self) -> bool {
        matches!(self, Method::Get | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => http::Method::GET,
            Method::Post => http::Method::POST,
            Method::Put => http::Method::PUT,
            Method::Patch => http::Method::PATCH,
            Method::Delete => http::Method::DELETE,
            Method::Options => http::Method::OPTIONS,
            Method::Trace => http::Method::TRACE,
        }
    }
}

/// Primitive kind of a path parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
}

impl ParamKind {
    /// Reads command-line style text as a value of this kind.
    #[must_use]
    pub fn parse(self, raw: &str) -> Option<serde_json::Value> {
        match self {
            ParamKind::String => Some(serde_json::Value::String(raw.to_owned())),
            ParamKind::Number => raw
                .parse::<i64>()
                .map(serde_json::Value::from)
                .ok()
                .or_else(|| {
                    raw.parse::<f64>()
                        .ok()
                        .and_then(serde_json::Number::from_f64)
                        .map(serde_json::Value::Number)
                }),
            ParamKind::Boolean => raw.parse::<bool>().ok().map(serde_json::Value::Bool),
        }
    }

    /// Whether `value` is of this kind.
    #[must_use]
    pub fn accepts(self, value: &serde_json::Value) -> bool {
        matches!(
            (self, value),
            (ParamKind::String, serde_json::Value::String(_))
                | (ParamKind::Number, serde_json::Value::Number(_))
                | (ParamKind::Boolean, serde_json::Value::Bool(_))
        )
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        })
    }
}

/// One named placeholder of a path template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// How a request payload travels in the body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    Json,
    /// `application/x-www-form-urlencoded`, absent fields skipped
    Form,
}

/// Static metadata of one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    /// Wire name used for runtime lookup, e.g. `todoGetAll`
    pub name: &'static str,
    pub method: Method,
    /// Template relative to the base URL, with `{name}` placeholders
    pub path: &'static str,
    pub path_params: &'static [PathParamSpec],
    /// Rust type of the request payload; `None` when the endpoint takes no input
    pub request_type: Option<&'static str>,
    /// Rust type the success body decodes into
    pub response_type: &'static str,
    pub encoding: BodyEncoding,
}

impl EndpointDescriptor {
    #[must_use]
    pub const fn has_request(&self) -> bool {
        self.request_type.is_some()
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&'static PathParamSpec> {
        self.path_params.iter().find(|spec| spec.name == name)
    }
}

const fn bytes_eq(a: &[u8], a_start: usize, a_end: usize, b: &[u8]) -> bool {
    if a_end - a_start != b.len() {
        return false;
    }
    let mut i = 0;
    while i < b.len() {
        if a[a_start + i] != b[i] {
            return false;
        }
        i += 1;
    }
    true
}

/// Byte-wise string equality usable in const context.
#[must_use]
pub const fn str_eq(a: &str, b: &str) -> bool {
    bytes_eq(a.as_bytes(), 0, a.len(), b.as_bytes())
}

/// Number of `{name}` placeholders in `template`, or `None` when braces are
/// unbalanced, nested, or a placeholder is empty.
const fn placeholder_count(template: &[u8]) -> Option<usize> {
    let mut count = 0;
    let mut open: Option<usize> = None;
    let mut i = 0;
    while i < template.len() {
        match (template[i], open) {
            (b'{', None) => open = Some(i),
            (b'}', Some(start)) => {
                if i == start + 1 {
                    return None;
                }
                count += 1;
                open = None;
            }
            (b'{' | b'}', _) => return None,
            _ => {}
        }
        i += 1;
    }
    if open.is_some() { None } else { Some(count) }
}

/// Occurrences of the placeholder `{name}` in `template`.
const fn occurrences(template: &[u8], name: &[u8]) -> usize {
    let mut found = 0;
    let mut i = 0;
    while i < template.len() {
        if template[i] == b'{' {
            let mut end = i + 1;
            while end < template.len() && template[end] != b'}' {
                end += 1;
            }
            if end < template.len() && bytes_eq(template, i + 1, end, name) {
                found += 1;
            }
            i = end;
        }
        i += 1;
    }
    found
}

/// `true` when every placeholder of `template` names exactly one entry of
/// `params` and every entry appears exactly once in `template`.
///
/// Every registered endpoint asserts this at compile time.
#[must_use]
pub const fn placeholders_match(template: &str, params: &[PathParamSpec]) -> bool {
    let bytes = template.as_bytes();
    let Some(count) = placeholder_count(bytes) else {
        return false;
    };
    if count != params.len() {
        return false;
    }
    let mut i = 0;
    while i < params.len() {
        if occurrences(bytes, params[i].name.as_bytes()) != 1 {
            return false;
        }
        i += 1;
    }
    true
}

/// `true` when no two descriptors share a wire name.
#[must_use]
pub const fn names_unique(descriptors: &[EndpointDescriptor]) -> bool {
    let mut i = 0;
    while i < descriptors.len() {
        let mut j = i + 1;
        while j < descriptors.len() {
            if str_eq(descriptors[i].name, descriptors[j].name) {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}
