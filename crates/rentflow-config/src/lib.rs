//! Shared configuration for rentflow tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `rentflow_core::PipelineConfig`. The CLI layers
//! its flag overrides on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rentflow_core::{
    AuthCredentials, MutationConfig, OfflineConfig, PipelineConfig, TlsVerification,
};

/// Environment variable that points at an alternative config file.
pub const CONFIG_PATH_ENV: &str = "RENTFLOW_CONFIG";

const KEYRING_SERVICE: &str = "rentflow";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{profile}'")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.into(),
            })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://app.example.com").
    pub url: String,

    /// Access token (plaintext, prefer keyring or env var).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Offline queue: failed replays beyond this count are dropped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,

    /// Offline queue: base backoff between replays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,

    /// Offline queue on/off.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offline_queue: Option<bool>,

    /// Run mutations on the same template one after another.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serialize_same_id: Option<bool>,
}

impl Profile {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Build a `PipelineConfig` with already resolved credentials.
    pub fn pipeline_config(
        &self,
        auth: AuthCredentials,
        defaults: &Defaults,
    ) -> Result<PipelineConfig, ConfigError> {
        let base_url: url::Url = self.url.parse().map_err(|_| ConfigError::Validation {
            field: "url".into(),
            reason: format!("invalid URL: {}", self.url),
        })?;

        let tls = if self.insecure.unwrap_or(defaults.insecure) {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        let mut offline = OfflineConfig::default();
        if let Some(enabled) = self.offline_queue {
            offline.enable_offline_queue = enabled;
        }
        if let Some(max) = self.max_retries {
            offline.max_retries = max;
        }
        if let Some(ms) = self.retry_delay_ms {
            offline.retry_delay = Duration::from_millis(ms);
        }

        Ok(PipelineConfig {
            base_url,
            auth,
            tls,
            timeout: Duration::from_secs(self.timeout.unwrap_or(defaults.timeout)),
            mutation: MutationConfig {
                serialize_same_id: self.serialize_same_id.unwrap_or(false),
            },
            offline,
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `RENTFLOW_CONFIG`, then XDG / platform
/// conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }
    ProjectDirs::from("com", "rentflow", "rentflow").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("rentflow");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Nested keys are addressed with a double underscore, e.g.
/// `RENTFLOW_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("RENTFLOW_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the access token from the credential chain.
///
/// `None` means requests go out unauthenticated.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    profile.token.clone().map(SecretString::from)
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token"))
}

/// Build a `PipelineConfig` from a profile, no CLI flag overrides.
pub fn profile_to_pipeline_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<PipelineConfig, ConfigError> {
    let auth = resolve_token(profile, profile_name)
        .map_or(AuthCredentials::Anonymous, AuthCredentials::Token);
    profile.pipeline_config(auth, defaults)
}
