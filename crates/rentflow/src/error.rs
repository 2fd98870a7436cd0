//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use rentflow_config::ConfigError;
use rentflow_core::{CoreError, ErrorCategory};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}")]
    #[diagnostic(
        code(rentflow::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             URL: {url}\n\
             Reason: {reason}\n\
             Try: rentflow health --insecure"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(rentflow::auth_failed),
        help(
            "Verify the access token for this profile.\n\
             Run: rentflow config set-token"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Template '{identifier}' not found")]
    #[diagnostic(
        code(rentflow::not_found),
        help("Run: rentflow templates list to see available templates")
    )]
    NotFound { identifier: String },

    #[error("{message}")]
    #[diagnostic(code(rentflow::conflict), help("Server code: {code}"))]
    Conflict { message: String, code: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(code(rentflow::api_error), help("{detail}"))]
    ApiError { message: String, detail: String },

    #[error("{unsynced} of {total} operations were not synced")]
    #[diagnostic(
        code(rentflow::sync_incomplete),
        help("Dropped operations are listed above. Fix them and run: rentflow sync <FILE>")
    )]
    SyncIncomplete { unsynced: usize, total: usize },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(rentflow::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(rentflow::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: rentflow config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(rentflow::no_config),
        help(
            "Create a profile with: rentflow config init\n\
             Or pass --url / set RENTFLOW_URL.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(rentflow::config))]
    Config(#[from] ConfigError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(rentflow::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(rentflow::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(rentflow::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        let message = err.user_message();
        let category = err.classification().error_type;

        match err {
            CoreError::TemplateNotFound { id } => CliError::NotFound { identifier: id },

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::AuthenticationFailed { .. } => CliError::AuthFailed { message },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Api {
                status: Some(404), ..
            } => CliError::NotFound {
                identifier: "(remote)".into(),
            },

            CoreError::Api {
                status: Some(409),
                code,
                ..
            } => CliError::Conflict {
                message,
                code: code.unwrap_or_default(),
            },

            CoreError::Api { .. } if category == ErrorCategory::AuthenticationError => {
                CliError::AuthFailed { message }
            }

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            other => CliError::ApiError {
                message,
                detail: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_exit_code_4() {
        let err = CliError::from(CoreError::TemplateNotFound { id: "t-1".into() });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
    }

    #[test]
    fn duplicate_title_is_a_conflict_with_localized_message() {
        let err = CliError::from(CoreError::Api {
            message: "duplicate key".into(),
            code: Some("DUPLICATE_TITLE".into()),
            status: Some(409),
        });
        assert_eq!(err.exit_code(), exit_code::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Ein Template mit diesem Titel existiert bereits."
        );
    }

    #[test]
    fn server_errors_fall_back_to_general() {
        let err = CliError::from(CoreError::Api {
            message: "boom".into(),
            code: None,
            status: Some(500),
        });
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn unauthorized_status_maps_to_auth() {
        let err = CliError::from(CoreError::Api {
            message: "nope".into(),
            code: None,
            status: Some(401),
        });
        assert_eq!(err.exit_code(), exit_code::AUTH);
    }
}
