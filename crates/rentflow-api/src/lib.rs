//! Async client for the rentflow template REST API.
//!
//! - **[`TemplateClient`]**: CRUD over `/api/templates` plus the
//!   no-cache `HEAD /api/health` liveness probe.
//! - **[`TransportConfig`]**: shared TLS and timeout settings.
//! - **[`Credentials`]**: optional bearer token forwarding.
//! - **[`Error`]**: transport and API failures, with the server's
//!   [`ApiErrorCode`] table and localized messages.

pub mod auth;
pub mod error;
pub mod templates;
pub mod transport;

pub use auth::Credentials;
pub use error::{ApiErrorCode, Error};
pub use templates::types::{BatchItemError, BatchResponse, TemplateRequest, TemplateResponse};
pub use templates::{DEFAULT_HEALTH_PATH, TemplateClient};
pub use transport::{TlsMode, TransportConfig};
