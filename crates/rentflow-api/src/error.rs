use std::str::FromStr;

use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Machine-readable error codes returned by the template API.
///
/// The first seven come from single-entity endpoints
/// (`{code, error, details?}` bodies); the rest appear in per-item
/// errors of batch responses.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    Unauthorized,
    DatabaseError,
    NotFound,
    InvalidId,
    ValidationError,
    DuplicateTitle,
    ForeignKeyConstraint,
    PermissionDenied,
    NetworkError,
    ServerError,
    ModelOverloaded,
}

impl ApiErrorCode {
    /// Fixed German message shown to the user for this code.
    pub fn localized_message(self) -> &'static str {
        match self {
            Self::Unauthorized => "Sitzung abgelaufen. Bitte melden Sie sich erneut an.",
            Self::DatabaseError => "Datenbankfehler. Bitte versuchen Sie es später erneut.",
            Self::NotFound => "Template nicht gefunden.",
            Self::InvalidId => "Ungültige Template-ID.",
            Self::ValidationError => {
                "Die Eingaben sind ungültig. Bitte überprüfen Sie die Felder."
            }
            Self::DuplicateTitle => "Ein Template mit diesem Titel existiert bereits.",
            Self::ForeignKeyConstraint => {
                "Das Template wird noch verwendet und kann nicht gelöscht werden."
            }
            Self::PermissionDenied => "Keine Berechtigung für diese Aktion.",
            Self::NetworkError => "Netzwerkfehler. Bitte überprüfen Sie Ihre Internetverbindung.",
            Self::ServerError => "Serverfehler. Bitte versuchen Sie es später erneut.",
            Self::ModelOverloaded => {
                "Der Dienst ist derzeit überlastet. Bitte versuchen Sie es später erneut."
            }
        }
    }

    /// Whether a batch item failing with this code is worth re-submitting.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::ServerError | Self::ModelOverloaded
        )
    }
}

/// Top-level error type for the `rentflow-api` crate.
///
/// Covers every failure mode of the template REST surface: credential
/// setup, transport, structured API errors and response decoding.
/// `rentflow-core` maps these into its own error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Credentials could not be applied or were rejected.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Rate limited by the backend. Includes retry-after in seconds.
    #[error("Rate limit exceeded -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error body (`{code, error, details?}`).
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<serde_json::Value>,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Api { status: 404, .. } => true,
            _ => self.api_error_code() == Some(ApiErrorCode::NotFound),
        }
    }

    /// HTTP status attached to this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            _ => None,
        }
    }

    /// The raw API error code string, if the body carried one.
    pub fn raw_code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// The API error code, if the body carried a known one.
    pub fn api_error_code(&self) -> Option<ApiErrorCode> {
        self.raw_code()
            .and_then(|code| ApiErrorCode::from_str(code).ok())
    }

    /// Human-readable German message for display.
    pub fn localized_message(&self) -> String {
        if let Some(code) = self.api_error_code() {
            return code.localized_message().to_owned();
        }
        match self {
            Self::Authentication { .. } => ApiErrorCode::Unauthorized.localized_message().into(),
            Self::Transport(e) if e.is_timeout() => {
                "Zeitüberschreitung der Anfrage. Bitte versuchen Sie es erneut.".into()
            }
            Self::Timeout { .. } => {
                "Zeitüberschreitung der Anfrage. Bitte versuchen Sie es erneut.".into()
            }
            Self::Transport(_) | Self::Tls(_) => {
                ApiErrorCode::NetworkError.localized_message().into()
            }
            Self::RateLimited { .. } => {
                "Zu viele Anfragen. Bitte warten Sie einen Moment.".into()
            }
            Self::Api { status, .. } if *status >= 500 => {
                ApiErrorCode::ServerError.localized_message().into()
            }
            Self::Api { message, .. } => message.clone(),
            Self::InvalidUrl(_) => "Ungültige Server-Adresse.".into(),
            Self::Deserialization { .. } => "Unerwartete Antwort vom Server.".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<&str>, message: &str) -> Error {
        Error::Api {
            status,
            code: code.map(String::from),
            message: message.into(),
            details: None,
        }
    }

    #[test]
    fn codes_parse_from_wire_form() {
        assert_eq!(
            ApiErrorCode::from_str("DUPLICATE_TITLE").ok(),
            Some(ApiErrorCode::DuplicateTitle)
        );
        assert_eq!(
            ApiErrorCode::ForeignKeyConstraint.as_ref(),
            "FOREIGN_KEY_CONSTRAINT"
        );
        assert_eq!(ApiErrorCode::NotFound.to_string(), "NOT_FOUND");
        assert!(ApiErrorCode::from_str("SOMETHING_ELSE").is_err());
    }

    #[test]
    fn unauthorized_maps_to_session_message() {
        let err = api(401, Some("UNAUTHORIZED"), "Unauthorized");
        assert_eq!(
            err.localized_message(),
            "Sitzung abgelaufen. Bitte melden Sie sich erneut an."
        );
    }

    #[test]
    fn unknown_code_falls_back_to_server_message() {
        let err = api(422, Some("WEIRD"), "Titel fehlt");
        assert_eq!(err.api_error_code(), None);
        assert_eq!(err.raw_code(), Some("WEIRD"));
        assert_eq!(err.localized_message(), "Titel fehlt");
    }

    #[test]
    fn server_status_is_transient() {
        assert!(api(503, None, "unavailable").is_transient());
        assert!(!api(400, None, "bad").is_transient());
        assert!(Error::RateLimited { retry_after_secs: 3 }.is_transient());
    }

    #[test]
    fn not_found_detected_by_status_or_code() {
        assert!(api(404, None, "missing").is_not_found());
        assert!(api(400, Some("NOT_FOUND"), "missing").is_not_found());
        assert!(!api(400, Some("INVALID_ID"), "bad id").is_not_found());
    }

    #[test]
    fn batch_retryability_by_code() {
        assert!(ApiErrorCode::NetworkError.is_retryable());
        assert!(ApiErrorCode::ServerError.is_retryable());
        assert!(ApiErrorCode::ModelOverloaded.is_retryable());
        assert!(!ApiErrorCode::NotFound.is_retryable());
        assert!(!ApiErrorCode::PermissionDenied.is_retryable());
        assert!(!ApiErrorCode::ValidationError.is_retryable());
    }
}
