use crate::error::ConfigurationError;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

const JSON: &str = "application/json";
const FORM: &str = "application/x-www-form-urlencoded";

/// `Bearer <token>`, marked sensitive so it never shows up in debug output.
pub(crate) fn bearer(token: &SecretString) -> Result<HeaderValue, ConfigurationError> {
    let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))
        .map_err(|_| {
            ConfigurationError::InvalidHeader("credential is not a valid header value".to_owned())
        })?;
    value.set_sensitive(true);
    Ok(value)
}

/// Default headers for one call, overridden by whatever the caller passed.
pub(crate) fn compose(
    form: bool,
    credential: Option<&SecretString>,
    caller: HeaderMap,
) -> Result<HeaderMap, ConfigurationError> {
    let mut headers = HeaderMap::with_capacity(3 + caller.len());
    headers.insert(ACCEPT, HeaderValue::from_static(JSON));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static(if form { FORM } else { JSON }),
    );
    if let Some(token) = credential {
        headers.insert(AUTHORIZATION, bearer(token)?);
    }

    // Replaces every value of each name present in `caller`
    headers.extend(caller);
    Ok(headers)
}
