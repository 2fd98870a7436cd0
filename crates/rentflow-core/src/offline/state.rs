use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::operation::OperationKind;

/// Connectivity phase. `Connecting` means the platform reported a
/// network but the health probe has not confirmed it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Online,
    Offline,
    Connecting,
}

/// Observable connectivity snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityState {
    /// `true` until the health probe confirms reachability.
    pub is_offline: bool,
    pub is_connecting: bool,
    pub last_online_time: Option<DateTime<Utc>>,
    /// Queued, in-flight and retry-scheduled operations.
    pub pending_operations_count: usize,
}

impl ConnectivityState {
    pub(crate) fn from_phase(
        phase: Phase,
        last_online_time: Option<DateTime<Utc>>,
        pending_operations_count: usize,
    ) -> Self {
        Self {
            is_offline: phase != Phase::Online,
            is_connecting: phase == Phase::Connecting,
            last_online_time,
            pending_operations_count,
        }
    }
}

/// Notifications published by the offline detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OfflineEvent {
    WentOffline,
    /// Platform reports a network; a health probe is under way.
    Reconnecting,
    BackOnline,
    /// Automatic health probe failed; another one is scheduled.
    ConnectionCheckFailed { message: String },
    /// Manually requested health probe failed.
    ManualRetryFailed { message: String },
    OperationSynced {
        operation: Uuid,
        kind: OperationKind,
        template_id: Option<String>,
    },
    OperationRetryScheduled {
        operation: Uuid,
        attempt: u32,
        delay_ms: u64,
    },
    /// Retries exhausted; the operation is gone.
    OperationDropped {
        operation: Uuid,
        kind: OperationKind,
        attempts: u32,
        message: String,
    },
    QueueDrained { synced: usize, remaining: usize },
}
