// ── Error classification ──
//
// Maps heterogeneous failures (transport errors, API error bodies, plain
// strings) onto one taxonomy. The taxonomy drives retry eligibility and
// which message the user gets. Rules are evaluated top-down; the first
// match wins.

use std::borrow::Cow;

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};

// ── Taxonomy ─────────────────────────────────────────────────────────

/// Category assigned to a classified failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    NetworkError,
    RateLimit,
    AuthenticationError,
    ContentSafetyError,
    ModelOverloaded,
    TimeoutError,
    ValidationError,
    ServerError,
    GenericApiError,
}

/// Pipeline stage at which the failure happened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Network,
    ApiLimit,
    Authentication,
    ContentFilter,
    ModelCapacity,
    Timeout,
    Validation,
    Server,
    Api,
}

impl ErrorCategory {
    /// Upper-case error code, e.g. `NETWORK_ERROR`.
    pub fn code(self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::RateLimit => "RATE_LIMIT",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::ContentSafetyError => "CONTENT_SAFETY_ERROR",
            Self::ModelOverloaded => "MODEL_OVERLOADED",
            Self::TimeoutError => "TIMEOUT_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ServerError => "SERVER_ERROR",
            Self::GenericApiError => "GENERIC_API_ERROR",
        }
    }

    /// Canonical HTTP status for the category (0 = no response at all).
    pub fn http_status(self) -> u16 {
        match self {
            Self::NetworkError => 0,
            Self::RateLimit => 429,
            Self::AuthenticationError => 401,
            Self::ContentSafetyError | Self::ValidationError => 400,
            Self::ModelOverloaded => 503,
            Self::TimeoutError => 408,
            Self::ServerError | Self::GenericApiError => 500,
        }
    }

    pub fn is_retryable(self) -> bool {
        !matches!(
            self,
            Self::AuthenticationError | Self::ContentSafetyError | Self::ValidationError
        )
    }

    pub fn failure_stage(self) -> FailureStage {
        match self {
            Self::NetworkError => FailureStage::Network,
            Self::RateLimit => FailureStage::ApiLimit,
            Self::AuthenticationError => FailureStage::Authentication,
            Self::ContentSafetyError => FailureStage::ContentFilter,
            Self::ModelOverloaded => FailureStage::ModelCapacity,
            Self::TimeoutError => FailureStage::Timeout,
            Self::ValidationError => FailureStage::Validation,
            Self::ServerError => FailureStage::Server,
            Self::GenericApiError => FailureStage::Api,
        }
    }
}

/// Structured result of [`classify`]. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    pub error_type: ErrorCategory,
    pub error_code: &'static str,
    pub http_status: u16,
    pub retryable: bool,
    pub failure_stage: FailureStage,
}

impl From<ErrorCategory> for ClassifiedError {
    fn from(category: ErrorCategory) -> Self {
        Self {
            error_type: category,
            error_code: category.code(),
            http_status: category.http_status(),
            retryable: category.is_retryable(),
            failure_stage: category.failure_stage(),
        }
    }
}

// ── Input ────────────────────────────────────────────────────────────

/// A raw failure to classify.
///
/// `transport` marks failures where the request never produced a
/// response (connection refused, DNS, aborted fetch). Plain strings
/// convert into non-transport inputs.
#[derive(Debug, Clone)]
pub struct ErrorInput<'a> {
    message: Cow<'a, str>,
    transport: bool,
    status: Option<u16>,
}

impl<'a> ErrorInput<'a> {
    pub fn message(message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: message.into(),
            transport: false,
            status: None,
        }
    }

    pub fn transport(message: impl Into<Cow<'a, str>>) -> Self {
        Self {
            message: message.into(),
            transport: true,
            status: None,
        }
    }

    /// Attach the HTTP status the failure arrived with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl<'a> From<&'a str> for ErrorInput<'a> {
    fn from(message: &'a str) -> Self {
        Self::message(message)
    }
}

impl From<String> for ErrorInput<'_> {
    fn from(message: String) -> Self {
        Self::message(message)
    }
}

impl From<&rentflow_api::Error> for ErrorInput<'static> {
    fn from(err: &rentflow_api::Error) -> Self {
        use rentflow_api::Error as ApiError;

        let input = match err {
            ApiError::Transport(e) if e.is_timeout() => {
                Self::message(format!("request timed out: {e}"))
            }
            ApiError::Transport(e) if e.is_connect() || e.is_request() => {
                Self::transport(format!("network request failed: {e}"))
            }
            ApiError::Api {
                code: Some(code),
                message,
                ..
            } => Self::message(format!("{code}: {message}")),
            ApiError::Authentication { .. } => Self::message(err.to_string()).with_status(401),
            other => Self::message(other.to_string()),
        };

        match err.status() {
            Some(status) => input.with_status(status),
            None => input,
        }
    }
}

// ── Rules ────────────────────────────────────────────────────────────

/// Normalized view the rule predicates run against.
struct Probe {
    message: String,
    transport: bool,
    status: Option<u16>,
}

impl Probe {
    fn mentions(&self, needles: &[&str]) -> bool {
        needles.iter().any(|n| self.message.contains(n))
    }
}

struct Rule {
    category: ErrorCategory,
    matches: fn(&Probe) -> bool,
}

/// Ordered classification table. Order matters: earlier rules shadow
/// later ones (a network failure mentioning "timeout" stays a network
/// failure; "invalid api key" is authentication, not validation).
const RULES: &[Rule] = &[
    Rule {
        category: ErrorCategory::NetworkError,
        matches: |p| p.transport || p.mentions(&["failed to fetch", "fetch failed", "network"]),
    },
    Rule {
        category: ErrorCategory::RateLimit,
        matches: |p| {
            p.status == Some(429)
                || p.mentions(&["rate limit", "rate_limit", "ratelimit", "too many requests"])
        },
    },
    Rule {
        category: ErrorCategory::AuthenticationError,
        matches: |p| {
            p.status == Some(401)
                || p.mentions(&[
                    "api key",
                    "api_key",
                    "invalid credentials",
                    "unauthorized",
                    "authentication",
                ])
        },
    },
    Rule {
        category: ErrorCategory::ContentSafetyError,
        matches: |p| p.mentions(&["safety", "content policy", "content violation"]),
    },
    Rule {
        category: ErrorCategory::ModelOverloaded,
        matches: |p| p.mentions(&["overloaded", "capacity"]),
    },
    Rule {
        category: ErrorCategory::TimeoutError,
        matches: |p| p.mentions(&["timeout", "timed out"]),
    },
    Rule {
        category: ErrorCategory::ValidationError,
        matches: |p| p.mentions(&["invalid", "validation"]),
    },
    Rule {
        category: ErrorCategory::ServerError,
        matches: |p| {
            p.status.is_some_and(|s| s >= 500)
                || p.mentions(&["server error", "internal error", "server_error"])
        },
    },
];

/// Classify a failure. Pure; never panics.
///
/// `response_status` is the HTTP status of the failed response, when one
/// exists; it takes precedence over any status embedded in the input.
pub fn classify<'a>(error: impl Into<ErrorInput<'a>>, response_status: Option<u16>) -> ClassifiedError {
    let input = error.into();
    let probe = Probe {
        message: input.message.to_lowercase(),
        transport: input.transport,
        status: response_status.or(input.status),
    };

    RULES
        .iter()
        .find(|rule| (rule.matches)(&probe))
        .map_or(ErrorCategory::GenericApiError, |rule| rule.category)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn failed_to_fetch_is_network() {
        let c = classify(ErrorInput::transport("Failed to fetch"), None);
        assert_eq!(c.error_type, ErrorCategory::NetworkError);
        assert_eq!(c.error_type.to_string(), "network_error");
        assert_eq!(c.http_status, 0);
        assert!(c.retryable);
        assert_eq!(c.failure_stage, FailureStage::Network);
    }

    #[test]
    fn rate_limit_message() {
        let c = classify("Rate limit exceeded", None);
        assert_eq!(c.error_type.as_ref(), "rate_limit");
        assert_eq!(c.http_status, 429);
        assert!(c.retryable);
        assert_eq!(c.failure_stage, FailureStage::ApiLimit);
    }

    #[test]
    fn rate_limit_by_status_only() {
        let c = classify("slow down", Some(429));
        assert_eq!(c.error_type, ErrorCategory::RateLimit);
    }

    #[test]
    fn invalid_api_key_is_authentication_not_validation() {
        let c = classify("Invalid API key provided", None);
        assert_eq!(c.error_type.to_string(), "authentication_error");
        assert_eq!(c.http_status, 401);
        assert!(!c.retryable);
    }

    #[test]
    fn status_401_is_authentication() {
        let c = classify("whatever", Some(401));
        assert_eq!(c.error_type, ErrorCategory::AuthenticationError);
    }

    #[test]
    fn content_safety() {
        let c = classify("Request blocked by safety system", None);
        assert_eq!(c.error_type, ErrorCategory::ContentSafetyError);
        assert_eq!(c.http_status, 400);
        assert!(!c.retryable);
        assert_eq!(c.failure_stage, FailureStage::ContentFilter);
    }

    #[test]
    fn overloaded() {
        let c = classify("The model is overloaded", None);
        assert_eq!(c.error_type, ErrorCategory::ModelOverloaded);
        assert_eq!(c.http_status, 503);
        assert!(c.retryable);
    }

    #[test]
    fn timeout_unless_network_matched_first() {
        let c = classify("Request timeout", None);
        assert_eq!(c.error_type, ErrorCategory::TimeoutError);
        assert_eq!(c.http_status, 408);

        let shadowed = classify("network timeout", None);
        assert_eq!(shadowed.error_type, ErrorCategory::NetworkError);
    }

    #[test]
    fn validation() {
        let c = classify("Invalid template payload", None);
        assert_eq!(c.error_type, ErrorCategory::ValidationError);
        assert!(!c.retryable);
        assert_eq!(c.failure_stage, FailureStage::Validation);
    }

    #[test]
    fn server_by_status_or_message() {
        assert_eq!(
            classify("boom", Some(502)).error_type,
            ErrorCategory::ServerError
        );
        assert_eq!(
            classify("Internal Server Error", None).error_type,
            ErrorCategory::ServerError
        );
    }

    #[test]
    fn default_is_generic_retryable() {
        let c = classify("something odd happened", None);
        assert_eq!(c.error_type, ErrorCategory::GenericApiError);
        assert_eq!(c.error_code, "GENERIC_API_ERROR");
        assert_eq!(c.http_status, 500);
        assert!(c.retryable);
        assert_eq!(c.failure_stage, FailureStage::Api);
    }

    #[test]
    fn string_and_owned_string_classify_identically() {
        let borrowed = classify("Rate limit exceeded", None);
        let owned = classify(String::from("Rate limit exceeded"), None);
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn explicit_status_overrides_embedded_one() {
        let input = ErrorInput::message("nope").with_status(500);
        assert_eq!(
            classify(input, Some(429)).error_type,
            ErrorCategory::RateLimit
        );
    }

    #[test]
    fn api_error_code_feeds_message() {
        let err = rentflow_api::Error::Api {
            status: 400,
            code: Some("VALIDATION_ERROR".into()),
            message: "titel fehlt".into(),
            details: None,
        };
        assert_eq!(
            classify(&err, None).error_type,
            ErrorCategory::ValidationError
        );

        let unauthorized = rentflow_api::Error::Api {
            status: 401,
            code: Some("UNAUTHORIZED".into()),
            message: "Sitzung abgelaufen".into(),
            details: None,
        };
        assert_eq!(
            classify(&unauthorized, None).error_type,
            ErrorCategory::AuthenticationError
        );

        let db = rentflow_api::Error::Api {
            status: 500,
            code: Some("DATABASE_ERROR".into()),
            message: "connection reset".into(),
            details: None,
        };
        assert_eq!(classify(&db, None).error_type, ErrorCategory::ServerError);
    }

    #[test]
    fn api_rate_limited_variant() {
        let err = rentflow_api::Error::RateLimited { retry_after_secs: 5 };
        let c = classify(&err, None);
        assert_eq!(c.error_type, ErrorCategory::RateLimit);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(classify("Rate limit exceeded", None)).unwrap_or_default();
        assert_eq!(json["errorType"], "rate_limit");
        assert_eq!(json["errorCode"], "RATE_LIMIT");
        assert_eq!(json["httpStatus"], 429);
        assert_eq!(json["retryable"], true);
        assert_eq!(json["failureStage"], "api_limit");
    }
}
