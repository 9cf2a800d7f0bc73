use crate::error::ConfigurationError;
use crate::registry::EndpointDescriptor;

/// Substitutes every `{name}` of the descriptor's template with the
/// percent-encoded value returned by `lookup`.
pub(crate) fn resolve(
    descriptor: &EndpointDescriptor,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigurationError> {
    let template: &'static str = descriptor.path;
    let mut resolved = String::with_capacity(template.len() + 16);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(len) = rest[open..].find('}') else {
            break;
        };
        let name = &rest[open + 1..open + len];
        resolved.push_str(&rest[..open]);

        let value = lookup(name).ok_or(ConfigurationError::MissingPathParam {
            endpoint: descriptor.name,
            param: name,
        })?;
        resolved.push_str(&urlencoding::encode(&value));

        rest = &rest[open + len + 1..];
    }
    resolved.push_str(rest);

    Ok(resolved)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::registry::{Endpoint, ItemGet, TodoGetAll, TodoGetOne};

    #[test]
    fn substitutes_placeholder() {
        let path = resolve(&ItemGet::DESCRIPTOR, |name| {
            (name == "id").then(|| "42".to_owned())
        })
        .unwrap();
        assert_eq!(path, "/items/42");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        let path = resolve(&TodoGetAll::DESCRIPTOR, |_| None).unwrap();
        assert_eq!(path, "/todo/");
    }

    #[test]
    fn values_are_encoded_as_one_segment() {
        let path = resolve(&ItemGet::DESCRIPTOR, |_| Some("a/b c?".to_owned())).unwrap();
        assert_eq!(path, "/items/a%2Fb%20c%3F");
        assert!(!path.contains('{'));
    }

    #[test]
    fn missing_value_names_endpoint_and_param() {
        let err = resolve(&TodoGetOne::DESCRIPTOR, |_| None).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingPathParam {
                endpoint: "todoGetOne",
                param: "todo_id",
            }
        );
    }
}
