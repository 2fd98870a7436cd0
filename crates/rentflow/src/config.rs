//! CLI configuration: thin wrapper around `rentflow_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--url, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use rentflow_core::{AuthCredentials, PipelineConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use rentflow_config::{
    Config, Profile, config_path, load_config_or_default, save_config, store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `PipelineConfig` from the config file, profile, and CLI overrides.
///
/// Flags win over profile values. Without a profile, `--url` alone is
/// enough; requests then go out anonymously unless `--token` is set.
pub fn build_pipeline_config(global: &GlobalOpts) -> Result<PipelineConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            let Some(url) = global.url.as_deref() else {
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            Profile::new(url)
        }
    };

    // 1. URL (flag > env > profile)
    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }

    // 2. Token (flag > profile chain)
    let auth = match global.token {
        Some(ref token) => AuthCredentials::Token(SecretString::from(token.clone())),
        None => rentflow_config::resolve_token(&profile, &profile_name)
            .map_or(AuthCredentials::Anonymous, AuthCredentials::Token),
    };

    let mut pipeline = profile.pipeline_config(auth, &cfg.defaults)?;

    // 3. TLS and timeout overrides
    if global.insecure {
        pipeline.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        pipeline.timeout = Duration::from_secs(secs);
    }

    Ok(pipeline)
}
