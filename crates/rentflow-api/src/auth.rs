use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// Credentials forwarded with every template request.
///
/// Session management itself lives outside this crate; the client only
/// carries whatever the caller already obtained.
#[derive(Debug, Clone, Default)]
pub enum Credentials {
    /// No authentication header.
    #[default]
    Anonymous,

    /// Access token sent as `Authorization: Bearer <token>`.
    Bearer { token: SecretString },
}

impl Credentials {
    /// Default headers to inject for this credential kind.
    pub(crate) fn default_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        if let Self::Bearer { token } = self {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| Error::Authentication {
                    message: format!("invalid token header value: {e}"),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_becomes_sensitive_header() {
        let creds = Credentials::Bearer {
            token: SecretString::from("abc123".to_owned()),
        };
        let headers = creds.default_headers().unwrap();
        let value = headers.get(AUTHORIZATION).unwrap();
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().unwrap(), "Bearer abc123");
    }

    #[test]
    fn anonymous_sends_nothing() {
        let headers = Credentials::Anonymous.default_headers().unwrap();
        assert!(headers.is_empty());
    }

    #[test]
    fn token_with_newline_is_rejected() {
        let creds = Credentials::Bearer {
            token: SecretString::from("bad\ntoken".to_owned()),
        };
        assert!(matches!(
            creds.default_headers(),
            Err(Error::Authentication { .. })
        ));
    }
}
