//! Resilient mutation pipeline for rentflow template clients.
//!
//! Sits between `rentflow-api` and user-facing consumers (the CLI):
//!
//! - **[`MutationService`]** applies create/update/delete to an in-memory
//!   [`TemplateStore`] before the backend answers, then confirms or rolls
//!   back. Subscribers are notified synchronously at fixed points per
//!   outcome.
//!
//! - **[`OfflineDetector`]** combines the platform's connectivity hint
//!   with an authoritative `HEAD` health probe, queues
//!   [`PendingOperation`]s while offline and replays them FIFO with
//!   bounded linear backoff once the backend is reachable again.
//!
//! - **[`classify()`]** maps any failure onto an [`ErrorCategory`] that
//!   decides retry eligibility and the failure stage.
//!
//! - **[`bulk`]** aggregates batch endpoint responses into a
//!   [`BulkOperationResult`] and composes the user-facing
//!   [`UserMessage`].

pub mod bulk;
pub mod classify;
pub mod config;
pub mod error;
pub mod model;
pub mod mutation;
pub mod offline;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bulk::{BulkOperationResult, UserMessage, compose, process};
pub use classify::{ClassifiedError, ErrorCategory, ErrorInput, FailureStage, classify};
pub use config::{AuthCredentials, MutationConfig, OfflineConfig, PipelineConfig, TlsVerification};
pub use error::CoreError;
pub use model::{EntityId, Template, TemplatePatch};
pub use mutation::{ErrorCallback, MutationService};
pub use offline::{
    ConnectivityState, OfflineDetector, OfflineEvent, OperationKind, PendingOperation,
};
pub use store::{Snapshot, Subject, Subscription, TemplateStore};

// Wire types callers need alongside the pipeline.
pub use rentflow_api::{BatchItemError, BatchResponse};
