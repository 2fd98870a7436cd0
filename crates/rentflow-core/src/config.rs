// ── Runtime pipeline configuration ──
//
// Describes how to reach the backend and how the mutation service and
// offline queue behave. Carries credentials but never touches disk; the
// CLI builds a `PipelineConfig` from its profile and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use rentflow_api::transport::{TlsMode, TransportConfig};
use rentflow_api::{Credentials, DEFAULT_HEALTH_PATH, TemplateClient};

use crate::error::CoreError;

/// Credentials forwarded with every request.
#[derive(Debug, Clone, Default)]
pub enum AuthCredentials {
    /// No authentication.
    #[default]
    Anonymous,
    /// Access token sent as a bearer header.
    Token(SecretString),
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (local development backends).
    DangerAcceptInvalid,
}

/// Optimistic mutation tuning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationConfig {
    /// Run mutations on the same id one after another instead of letting
    /// them race.
    pub serialize_same_id: bool,
}

/// Offline queue tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineConfig {
    pub enable_offline_queue: bool,
    /// Failed dispatches beyond this count drop the operation.
    pub max_retries: u32,
    /// Base backoff; the n-th retry waits `retry_delay * n`.
    pub retry_delay: Duration,
    /// Delay before re-probing after a failed health check.
    pub probe_retry_delay: Duration,
    pub health_path: String,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            enable_offline_queue: true,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            probe_retry_delay: Duration::from_secs(5),
            health_path: DEFAULT_HEALTH_PATH.into(),
        }
    }
}

/// Everything needed to talk to one backend.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub base_url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
    pub mutation: MutationConfig,
    pub offline: OfflineConfig,
}

impl PipelineConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            auth: AuthCredentials::default(),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            mutation: MutationConfig::default(),
            offline: OfflineConfig::default(),
        }
    }

    /// Build the HTTP client for this configuration.
    pub fn build_client(&self) -> Result<TemplateClient, CoreError> {
        let credentials = match &self.auth {
            AuthCredentials::Anonymous => Credentials::Anonymous,
            AuthCredentials::Token(token) => Credentials::Bearer {
                token: token.clone(),
            },
        };
        Ok(TemplateClient::new(
            self.base_url.as_str(),
            &credentials,
            &self.transport(),
        )?)
    }

    fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };
        TransportConfig {
            tls,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn offline_defaults() {
        let cfg = OfflineConfig::default();
        assert!(cfg.enable_offline_queue);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_delay, Duration::from_secs(1));
        assert_eq!(cfg.health_path, "/api/health");
    }

    #[test]
    fn builds_client_for_base_url() {
        let cfg = PipelineConfig::new("http://localhost:3000".parse().unwrap());
        let client = cfg.build_client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:3000/");
        assert!(!cfg.mutation.serialize_same_id);
    }
}
