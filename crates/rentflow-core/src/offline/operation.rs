use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

use crate::model::TemplatePatch;

/// REST verb a queued operation replays as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
    /// Anything else read from input; dropped at replay.
    #[serde(other)]
    Unknown,
}

/// A mutation recorded while offline, replayed once connectivity is
/// confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    #[serde(default)]
    pub payload: TemplatePatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub attempt_count: u32,
    /// Position assigned when queued; replay order follows it.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl PendingOperation {
    fn new(kind: OperationKind, payload: TemplatePatch, target_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            payload,
            target_id,
            enqueued_at: Utc::now(),
            attempt_count: 0,
            seq: 0,
        }
    }

    pub fn create(payload: TemplatePatch) -> Self {
        Self::new(OperationKind::Create, payload, None)
    }

    pub fn update(target_id: impl Into<String>, payload: TemplatePatch) -> Self {
        Self::new(OperationKind::Update, payload, Some(target_id.into()))
    }

    pub fn delete(target_id: impl Into<String>) -> Self {
        Self::new(OperationKind::Delete, TemplatePatch::default(), Some(target_id.into()))
    }
}
