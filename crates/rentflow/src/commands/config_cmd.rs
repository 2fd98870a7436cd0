//! Config subcommand handlers.

use std::io::IsTerminal;

use dialoguer::{Input, Password};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display. Tokens must already be masked.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let Some(p) = cfg.profiles.get(name) else {
            continue;
        };
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if let Some(ref token) = p.token {
            let _ = writeln!(out, "token = \"{token}\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(max) = p.max_retries {
            let _ = writeln!(out, "max_retries = {max}");
        }
        if let Some(ms) = p.retry_delay_ms {
            let _ = writeln!(out, "retry_delay_ms = {ms}");
        }
        if let Some(enabled) = p.offline_queue {
            let _ = writeln!(out, "offline_queue = {enabled}");
        }
        if let Some(serialize) = p.serialize_same_id {
            let _ = writeln!(out, "serialize_same_id = {serialize}");
        }
    }

    out
}

fn save_config(cfg: &Config) -> Result<(), CliError> {
    config::save_config(cfg)?;
    Ok(())
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

/// Prompt for a value unless stdin is not a terminal.
fn require_interactive(field: &str) -> Result<(), CliError> {
    if std::io::stdin().is_terminal() {
        Ok(())
    } else {
        Err(CliError::Validation {
            field: field.into(),
            reason: "no value given and stdin is not interactive".into(),
        })
    }
}

fn parse_flag<T: std::str::FromStr>(key: &str, value: &str, hint: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: hint.into(),
    })
}

fn profile_not_found(cfg: &Config, name: &str) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name: name.into(),
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init ────────────────────────────────────────────────────
        ConfigCommand::Init { url, token_env } => {
            let config_path = config::config_path();
            let mut cfg = config::load_config_or_default();
            let profile_name = global.profile.clone().unwrap_or_else(|| "default".into());

            let url = match url.or_else(|| global.url.clone()) {
                Some(url) => url,
                None => {
                    require_interactive("url")?;
                    Input::new()
                        .with_prompt("Backend URL")
                        .default("http://localhost:3000".into())
                        .interact_text()
                        .map_err(prompt_err)?
                }
            };
            if url::Url::parse(&url).is_err() {
                return Err(CliError::Validation {
                    field: "url".into(),
                    reason: format!("invalid URL: {url}"),
                });
            }

            let profile = Profile {
                token_env,
                ..Profile::new(url)
            };
            cfg.profiles.insert(profile_name.clone(), profile);
            if cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            save_config(&cfg)?;

            if !global.quiet {
                eprintln!("✓ Profile '{profile_name}' written to {}", config_path.display());
                eprintln!("  Store a token with: rentflow config set-token");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let mut cfg = config::load_config_or_default();
            for profile in cfg.profiles.values_mut() {
                if profile.token.is_some() {
                    profile.token = Some("****".into());
                }
            }
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);
            let profile = cfg
                .profiles
                .entry(profile_name.clone())
                .or_insert_with(|| Profile::new(""));

            match key.as_str() {
                "url" => {
                    if url::Url::parse(&value).is_err() {
                        return Err(CliError::Validation {
                            field: "url".into(),
                            reason: format!("invalid URL: {value}"),
                        });
                    }
                    profile.url = value;
                }
                "token_env" | "token-env" => profile.token_env = Some(value),
                "ca_cert" | "ca-cert" => profile.ca_cert = Some(value.into()),
                "insecure" => {
                    profile.insecure = Some(parse_flag(&key, &value, "must be 'true' or 'false'")?);
                }
                "timeout" => {
                    profile.timeout = Some(parse_flag(&key, &value, "must be a number (seconds)")?);
                }
                "max_retries" | "max-retries" => {
                    profile.max_retries = Some(parse_flag(&key, &value, "must be a number")?);
                }
                "retry_delay_ms" | "retry-delay-ms" => {
                    profile.retry_delay_ms =
                        Some(parse_flag(&key, &value, "must be a number (milliseconds)")?);
                }
                "offline_queue" | "offline-queue" => {
                    profile.offline_queue =
                        Some(parse_flag(&key, &value, "must be 'true' or 'false'")?);
                }
                "serialize_same_id" | "serialize-same-id" => {
                    profile.serialize_same_id =
                        Some(parse_flag(&key, &value, "must be 'true' or 'false'")?);
                }
                other => {
                    return Err(CliError::Validation {
                        field: other.into(),
                        reason: format!(
                            "unknown config key '{other}'. Valid keys: url, token_env, ca_cert, \
                             insecure, timeout, max_retries, retry_delay_ms, offline_queue, \
                             serialize_same_id"
                        ),
                    });
                }
            }

            save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Set {key} on profile '{profile_name}'");
            }
            Ok(())
        }

        // ── SetToken ────────────────────────────────────────────────
        ConfigCommand::SetToken { value, plaintext } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = config::active_profile_name(global, &cfg);

            let token = match value {
                Some(token) => token,
                None => {
                    require_interactive("token")?;
                    Password::new()
                        .with_prompt("Access token")
                        .interact()
                        .map_err(prompt_err)?
                }
            };
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            if plaintext {
                let Some(profile) = cfg.profiles.get_mut(&profile_name) else {
                    return Err(profile_not_found(&cfg, &profile_name));
                };
                profile.token = Some(token);
                save_config(&cfg)?;
                if !global.quiet {
                    eprintln!("✓ Token saved to config file for profile '{profile_name}'");
                }
            } else {
                config::store_token(&profile_name, &token)?;
                if !global.quiet {
                    eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
                }
            }
            Ok(())
        }
    }
}
