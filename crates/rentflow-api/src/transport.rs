// HTTP client construction shared by the template client and the
// connectivity checker. Both talk to the same backend, so they must agree
// on certificate handling and request deadlines.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::ClientBuilder;
use reqwest::header::HeaderMap;

use crate::error::Error;

const USER_AGENT: &str = concat!("rentflow/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the backend's TLS certificate is verified.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Platform trust store.
    #[default]
    System,
    /// Trust the PEM-encoded CA at this path in addition to the platform store.
    CustomCa(PathBuf),
    /// Skip verification entirely. Only for self-signed dev backends.
    DangerAcceptInvalid,
}

/// Certificate and deadline settings for backend requests.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    /// Whole-request deadline, connect included.
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.build_client_with_headers(HeaderMap::new())
    }

    /// Like [`build_client`](Self::build_client), with headers sent on every
    /// request (the bearer token, for instance).
    pub fn build_client_with_headers(&self, headers: HeaderMap) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(self.timeout)
            .default_headers(headers);

        self.apply_tls(builder)?
            .build()
            .map_err(|e| Error::Tls(format!("cannot build HTTP client: {e}")))
    }

    fn apply_tls(&self, builder: ClientBuilder) -> Result<ClientBuilder, Error> {
        Ok(match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => {
                let shown = path.display();
                let pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("cannot read CA bundle {shown}: {e}")))?;
                let ca = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| Error::Tls(format!("CA bundle {shown} is not valid PEM: {e}")))?;
                builder.add_root_certificate(ca)
            }
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        })
    }
}
