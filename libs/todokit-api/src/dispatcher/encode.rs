use crate::error::ConfigurationError;
use crate::registry::{BodyEncoding, EndpointDescriptor};
use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

/// Caller input, before the method decides where it goes
pub(crate) enum Input {
    Value(Value),
    /// Already `application/x-www-form-urlencoded`
    RawForm(String),
}

/// Where and how the input travels
#[derive(Debug, PartialEq)]
pub(crate) enum Encoded {
    Nothing,
    Query(String),
    Json(Bytes),
    Form(String),
}

pub(crate) fn to_value<T: Serialize + ?Sized>(
    descriptor: &EndpointDescriptor,
    input: &T,
) -> Result<Value, ConfigurationError> {
    serde_json::to_value(input).map_err(|e| encode_error(descriptor, e.to_string()))
}

/// GET and DELETE put the input in the query string; other methods send it as
/// the body, form-encoded for form endpoints and raw forms, JSON otherwise.
pub(crate) fn encode(
    descriptor: &EndpointDescriptor,
    input: Option<Input>,
) -> Result<Encoded, ConfigurationError> {
    let Some(input) = input else {
        return Ok(Encoded::Nothing);
    };

    Ok(match (input, descriptor.method.uses_query()) {
        (Input::Value(Value::Null), _) => Encoded::Nothing,
        (Input::RawForm(raw), true) if raw.is_empty() => Encoded::Nothing,
        (Input::RawForm(raw), true) => Encoded::Query(raw),
        (Input::RawForm(raw), false) => Encoded::Form(raw),
        (Input::Value(value), true) => {
            let query = pairs(descriptor, &value)?;
            if query.is_empty() {
                Encoded::Nothing
            } else {
                Encoded::Query(query)
            }
        }
        (Input::Value(value), false) => match descriptor.encoding {
            BodyEncoding::Form => Encoded::Form(pairs(descriptor, &value)?),
            BodyEncoding::Json => Encoded::Json(Bytes::from(
                serde_json::to_vec(&value).map_err(|e| encode_error(descriptor, e.to_string()))?,
            )),
        },
    })
}

/// `key=value` pairs of a flat object. Arrays repeat their key once per
/// element in order; null fields and null elements are skipped.
fn pairs(descriptor: &EndpointDescriptor, value: &Value) -> Result<String, ConfigurationError> {
    let Value::Object(fields) = value else {
        return Err(encode_error(
            descriptor,
            format!("expected an object of fields, got {}", kind_of(value)),
        ));
    };

    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, field) in fields {
        match field {
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar(descriptor, key, item)? {
                        out.append_pair(key, &s);
                    }
                }
            }
            other => {
                if let Some(s) = scalar(descriptor, key, other)? {
                    out.append_pair(key, &s);
                }
            }
        }
    }
    Ok(out.finish())
}

fn scalar(
    descriptor: &EndpointDescriptor,
    key: &str,
    value: &Value,
) -> Result<Option<String>, ConfigurationError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(encode_error(
            descriptor,
            format!("field `{key}` is a nested {}", kind_of(value)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn encode_error(descriptor: &EndpointDescriptor, reason: String) -> ConfigurationError {
    ConfigurationError::Encode {
        endpoint: descriptor.name,
        reason,
    }
}
