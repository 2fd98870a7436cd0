// ── Core error types ──
//
// Errors surfaced by the mutation pipeline. The `From<rentflow_api::Error>`
// impl folds transport-layer failures into pipeline-level variants; the
// raw API code survives in `Api::code` so localized messages still work.

use std::str::FromStr;

use rentflow_api::ApiErrorCode;
use thiserror::Error;

use crate::classify::{ClassifiedError, ErrorInput, classify};

const TIMEOUT_MESSAGE: &str = "Zeitüberschreitung der Anfrage. Bitte versuchen Sie es erneut.";
const GENERIC_MESSAGE: &str = "Ein unerwarteter Fehler ist aufgetreten.";

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    /// The id is not present in the local collection.
    #[error("Template nicht gefunden")]
    TemplateNotFound { id: String },

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── API errors ───────────────────────────────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// Server error code, e.g. `DUPLICATE_TITLE`.
        code: Option<String>,
        status: Option<u16>,
    },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status attached to the failure, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            Self::AuthenticationFailed { .. } => Some(401),
            _ => None,
        }
    }

    /// Known server error code, if any.
    pub fn api_error_code(&self) -> Option<ApiErrorCode> {
        match self {
            Self::Api { code: Some(code), .. } => ApiErrorCode::from_str(code).ok(),
            _ => None,
        }
    }

    /// Run this error through the classifier.
    pub fn classification(&self) -> ClassifiedError {
        let input = match self {
            Self::ConnectionFailed { reason, .. } => ErrorInput::transport(reason.as_str()),
            Self::Timeout { .. } => ErrorInput::message("request timed out"),
            Self::Api {
                message,
                code: Some(code),
                ..
            } => ErrorInput::message(format!("{code}: {message}")),
            Self::ValidationFailed { message } => {
                ErrorInput::message(format!("validation failed: {message}"))
            }
            other => ErrorInput::message(other.to_string()),
        };
        let input = match self.status() {
            Some(status) => input.with_status(status),
            None => input,
        };
        classify(input, None)
    }

    /// Localized message for the error callback and CLI output.
    pub fn user_message(&self) -> String {
        if let Some(code) = self.api_error_code() {
            return code.localized_message().to_owned();
        }
        match self {
            Self::TemplateNotFound { .. } => "Template nicht gefunden".into(),
            Self::ConnectionFailed { .. } => ApiErrorCode::NetworkError.localized_message().into(),
            Self::AuthenticationFailed { .. } => {
                ApiErrorCode::Unauthorized.localized_message().into()
            }
            Self::Timeout { .. } => TIMEOUT_MESSAGE.into(),
            Self::Api {
                status: Some(429), ..
            } => "Zu viele Anfragen. Bitte warten Sie einen Moment.".into(),
            Self::Api {
                status: Some(s), ..
            } if *s >= 500 => ApiErrorCode::ServerError.localized_message().into(),
            Self::Api { message, .. } | Self::ValidationFailed { message } => message.clone(),
            Self::Config { .. } | Self::Internal(_) => GENERIC_MESSAGE.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.classification().retryable
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<rentflow_api::Error> for CoreError {
    fn from(err: rentflow_api::Error) -> Self {
        use rentflow_api::Error as ApiError;

        match err {
            ApiError::Authentication { message } => Self::AuthenticationFailed { message },
            ApiError::Transport(ref e) => {
                if e.is_timeout() {
                    Self::Timeout { timeout_secs: 0 }
                } else if e.is_connect() || e.is_request() {
                    Self::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    Self::Api {
                        message: e.to_string(),
                        code: None,
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            ApiError::InvalidUrl(e) => Self::Config {
                message: format!("Invalid URL: {e}"),
            },
            ApiError::Timeout { timeout_secs } => Self::Timeout { timeout_secs },
            ApiError::Tls(msg) => Self::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            ApiError::RateLimited { retry_after_secs } => Self::Api {
                message: format!("Rate limit exceeded -- retry after {retry_after_secs}s"),
                code: None,
                status: Some(429),
            },
            ApiError::Api {
                status,
                code,
                message,
                ..
            } => Self::Api {
                message,
                code,
                status: Some(status),
            },
            ApiError::Deserialization { message, body: _ } => {
                Self::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
