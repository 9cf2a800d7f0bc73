use crate::error::ApiError;
use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, UnitDeserializer};
use serde_json::{Map, Value};

/// Decodes a 2xx body into `T`.
///
/// A 204 or a blank body becomes the absence value of `T` (`NoContent`,
/// `None`, JSON null) without touching the JSON parser.
pub(crate) fn success<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ApiError> {
    if status == 204 || body.trim_ascii().is_empty() {
        return T::deserialize(UnitDeserializer::<ValueError>::new()).map_err(|e| {
            ApiError::undecodable(status, empty_object(), format!("empty response body: {e}"))
        });
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::undecodable(status, payload(body), e.to_string()))
}

/// Best-effort structured view of an error body; `{}` when it is not JSON.
pub(crate) fn payload(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap_or_else(|_| empty_object())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::registry::{NoContent, Todo};
    use serde_json::json;

    #[test]
    fn no_content_yields_absence() {
        assert_eq!(success::<NoContent>(204, b"").unwrap(), NoContent);
        assert_eq!(success::<Option<Todo>>(204, b"").unwrap(), None);
        assert_eq!(success::<Value>(200, b"  \n").unwrap(), Value::Null);
    }

    #[test]
    fn no_content_skips_parsing_even_with_a_body() {
        assert_eq!(success::<NoContent>(204, b"not json").unwrap(), NoContent);
    }

    #[test]
    fn empty_body_for_concrete_type_is_an_error() {
        let err = success::<Todo>(200, b"").unwrap_err();
        assert_eq!(err.status(), 200);
        assert_eq!(err.payload(), Some(&json!({})));
        assert!(err.reason().unwrap().starts_with("empty response body"));
    }

    #[test]
    fn no_content_needs_an_optional_response_type() {
        let err = success::<bool>(204, b"").unwrap_err();
        assert_eq!(err.status(), 204);
        assert!(err.reason().unwrap().starts_with("empty response body"));

        assert_eq!(success::<Option<bool>>(204, b"").unwrap(), None);
    }

    #[test]
    fn decodes_typed_body() {
        let todo: Todo = success(200, br#"{"id": 3, "item": "milk"}"#).unwrap();
        assert_eq!(todo.id, 3);
        assert!(success::<bool>(200, b"true").unwrap());
    }

    #[test]
    fn mismatched_body_keeps_payload() {
        let err = success::<Todo>(200, br#"{"unexpected": true}"#).unwrap_err();
        assert_eq!(err.payload(), Some(&json!({"unexpected": true})));
        assert!(err.reason().unwrap().contains("missing field"));

        let err = success::<Todo>(200, b"<html>").unwrap_err();
        assert_eq!(err.payload(), Some(&json!({})));
    }

    #[test]
    fn error_payload_is_best_effort() {
        assert_eq!(payload(br#"{"detail": "nope"}"#), json!({"detail": "nope"}));
        assert_eq!(payload(b"Internal Server Error"), json!({}));
        assert_eq!(payload(b""), json!({}));
    }
}
