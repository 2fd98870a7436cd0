// Async HTTP client for the template REST endpoints.
//
// Base path: /api/
// Auth: optional bearer token

use reqwest::header::{CACHE_CONTROL, HeaderValue, PRAGMA, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::types::{
    ErrorResponse, TemplateEnvelope, TemplateList, TemplateRequest, TemplateResponse,
};
use crate::auth::Credentials;
use crate::error::Error;
use crate::transport::TransportConfig;

/// Default liveness endpoint for the connectivity probe.
pub const DEFAULT_HEALTH_PATH: &str = "/api/health";

const TEMPLATES_PATH: &str = "api/templates";

/// Async client for the template API.
///
/// Cheap to clone: the inner `reqwest::Client` is reference-counted.
#[derive(Clone)]
pub struct TemplateClient {
    http: reqwest::Client,
    base_url: Url,
}

impl TemplateClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a base URL, credentials and transport config.
    ///
    /// Bearer tokens are injected as a default header.
    pub fn new(
        base_url: &str,
        credentials: &Credentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client_with_headers(credentials.default_headers()?)?;
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Ensure the base URL ends with `/` so relative joins keep any prefix.
    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let mut url = Url::parse(raw)?;
        let path = url.path().trim_end_matches('/').to_owned();
        url.set_path(&format!("{path}/"));
        Ok(url)
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builder ──────────────────────────────────────────────────

    fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `{base}/api/templates/{id}` with `id` as one percent-encoded segment,
    /// so ids containing `/` or `..` cannot reach other endpoints.
    fn template_url(&self, id: &str) -> Result<Url, Error> {
        let mut url = self.url(TEMPLATES_PATH)?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {url}");
        let resp = self.http.get(url).send().await?;
        self.handle_response(resp).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("POST {url}");
        let resp = self.http.post(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, Error> {
        debug!("PUT {url}");
        let resp = self.http.put(url).json(body).send().await?;
        self.handle_response(resp).await
    }

    async fn delete(&self, url: Url) -> Result<(), Error> {
        debug!("DELETE {url}");
        let resp = self.http.delete(url).send().await?;
        self.handle_empty(resp).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn handle_empty(&self, resp: reqwest::Response) -> Result<(), Error> {
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.parse_error(status, resp).await)
        }
    }

    async fn parse_error(&self, status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            return Error::RateLimited { retry_after_secs };
        }

        let raw = resp.text().await.unwrap_or_default();

        let (code, message, details) = match serde_json::from_str::<ErrorResponse>(&raw) {
            Ok(err) => (
                err.code,
                err.error.unwrap_or_else(|| status.to_string()),
                err.details,
            ),
            Err(_) => (
                None,
                if raw.is_empty() {
                    status.to_string()
                } else {
                    raw
                },
                None,
            ),
        };

        let code = match code {
            None if status == reqwest::StatusCode::UNAUTHORIZED => Some("UNAUTHORIZED".into()),
            other => other,
        };

        Error::Api {
            status: status.as_u16(),
            code,
            message,
            details,
        }
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    // ── Templates ────────────────────────────────────────────────────

    /// `GET /api/templates`
    pub async fn list_templates(&self) -> Result<Vec<TemplateResponse>, Error> {
        let list: TemplateList = self.get(self.url(TEMPLATES_PATH)?).await?;
        Ok(list.into())
    }

    /// `GET /api/templates/{id}`
    pub async fn get_template(&self, id: &str) -> Result<TemplateResponse, Error> {
        let envelope: TemplateEnvelope = self.get(self.template_url(id)?).await?;
        Ok(envelope.into())
    }

    /// `POST /api/templates`
    pub async fn create_template(
        &self,
        body: &TemplateRequest,
    ) -> Result<TemplateResponse, Error> {
        let envelope: TemplateEnvelope = self.post(self.url(TEMPLATES_PATH)?, body).await?;
        Ok(envelope.into())
    }

    /// `PUT /api/templates/{id}` (partial bodies allowed)
    pub async fn update_template(
        &self,
        id: &str,
        body: &TemplateRequest,
    ) -> Result<TemplateResponse, Error> {
        let envelope: TemplateEnvelope = self.put(self.template_url(id)?, body).await?;
        Ok(envelope.into())
    }

    /// `DELETE /api/templates/{id}`
    pub async fn delete_template(&self, id: &str) -> Result<(), Error> {
        self.delete(self.template_url(id)?).await
    }

    // ── Health ───────────────────────────────────────────────────────

    /// `HEAD {path}` with caching disabled. Any 2xx counts as reachable.
    pub async fn check_health(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("HEAD {url}");
        let resp = self
            .http
            .head(url)
            .header(CACHE_CONTROL, HeaderValue::from_static("no-cache"))
            .header(PRAGMA, HeaderValue::from_static("no-cache"))
            .send()
            .await?;
        self.handle_empty(resp).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_trailing_slash() {
        let client =
            TemplateClient::from_reqwest("http://localhost:3000/app", reqwest::Client::new())
                .unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/app/");
        assert_eq!(
            client.url("/api/health").unwrap().as_str(),
            "http://localhost:3000/app/api/health"
        );
        assert_eq!(
            client.template_url("abc").unwrap().as_str(),
            "http://localhost:3000/app/api/templates/abc"
        );
    }

    #[test]
    fn template_id_is_a_single_encoded_segment() {
        let client =
            TemplateClient::from_reqwest("http://localhost:3000/app", reqwest::Client::new())
                .unwrap();
        let url = client.template_url("../health").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/app/api/templates/..%2Fhealth"
        );
        assert!(url.path().starts_with("/app/api/templates/"));

        let url = client.template_url("a b/c?d").unwrap();
        assert_eq!(url.path(), "/app/api/templates/a%20b%2Fc%3Fd");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = TemplateClient::from_reqwest("not a url", reqwest::Client::new());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }
}
