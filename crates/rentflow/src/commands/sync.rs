//! Replay of operations recorded while offline.
//!
//! Operations are queued on a detector that starts offline, then the
//! backend is probed. A successful probe drains the queue; failed
//! operations are retried on the detector's backoff until they sync, get
//! dropped, or `--wait` runs out.

use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use rentflow_core::{OfflineDetector, OfflineEvent, PendingOperation, PipelineConfig};

use crate::cli::{GlobalOpts, SyncArgs};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Outcome tracking ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncOutcome {
    operation: String,
    kind: String,
    target_id: Option<String>,
    status: &'static str,
    template_id: Option<String>,
    message: Option<String>,
}

impl From<&PendingOperation> for SyncOutcome {
    fn from(op: &PendingOperation) -> Self {
        Self {
            operation: op.id.to_string(),
            kind: op.kind.to_string(),
            target_id: op.target_id.clone(),
            status: "queued",
            template_id: None,
            message: None,
        }
    }
}

#[derive(Tabled)]
struct OutcomeRow {
    #[tabled(rename = "Operation")]
    operation: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Template")]
    template: String,
    #[tabled(rename = "Message")]
    message: String,
}

fn find<'a>(outcomes: &'a mut [SyncOutcome], operation: &str) -> Option<&'a mut SyncOutcome> {
    outcomes.iter_mut().find(|o| o.operation == operation)
}

fn apply(outcomes: &mut [SyncOutcome], event: OfflineEvent) {
    match event {
        OfflineEvent::OperationSynced {
            operation,
            template_id,
            ..
        } => {
            if let Some(o) = find(outcomes, &operation.to_string()) {
                o.status = "synced";
                o.template_id = template_id;
                o.message = None;
            }
        }
        OfflineEvent::OperationRetryScheduled {
            operation,
            attempt,
            delay_ms,
        } => {
            if let Some(o) = find(outcomes, &operation.to_string()) {
                o.status = "retrying";
                o.message = Some(format!("attempt {attempt} failed, retry in {delay_ms}ms"));
            }
        }
        OfflineEvent::OperationDropped {
            operation,
            attempts,
            message,
            ..
        } => {
            if let Some(o) = find(outcomes, &operation.to_string()) {
                o.status = "dropped";
                o.message = Some(format!("{message} (after {attempts} attempts)"));
            }
        }
        other => debug!(event = ?other, "connectivity event"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    pipeline: &PipelineConfig,
    args: SyncArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let ops: Vec<PendingOperation> = serde_json::from_value(util::read_json_file(&args.input)?)?;
    let mut outcomes: Vec<SyncOutcome> = ops.iter().map(SyncOutcome::from).collect();

    let detector = OfflineDetector::from_config(pipeline, false)?;
    let mut events = detector.events();
    let mut state = detector.state();

    for op in ops {
        if !detector.queue_operation(op) {
            return Err(CliError::Validation {
                field: "offline_queue".into(),
                reason: "the offline queue is disabled for this profile".into(),
            });
        }
    }

    if let Err(err) = detector.retry_connection().await {
        detector.shutdown().await;
        return Err(err.into());
    }

    let deadline = tokio::time::sleep(Duration::from_secs(args.wait));
    tokio::pin!(deadline);

    while detector.pending_operations_count() > 0 {
        tokio::select! {
            biased;
            () = &mut deadline => {
                warn!(
                    pending = detector.pending_operations_count(),
                    "gave up waiting for scheduled retries"
                );
                break;
            }
            event = events.recv() => match event {
                Ok(event) => apply(&mut outcomes, event),
                Err(RecvError::Lagged(missed)) => warn!(missed, "connectivity events lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    while let Ok(event) = events.try_recv() {
        apply(&mut outcomes, event);
    }
    let still_pending = detector.pending_operations_count() > 0;
    detector.shutdown().await;

    // Operations the detector refused to replay never report back.
    if !still_pending {
        for o in outcomes.iter_mut().filter(|o| o.status == "queued") {
            o.status = "skipped";
            o.message = Some("unsupported operation".into());
        }
    }

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &outcomes,
        |o| OutcomeRow {
            operation: o.operation.clone(),
            kind: o.kind.clone(),
            status: output::paint_status(o.status, color),
            template: o
                .template_id
                .clone()
                .or_else(|| o.target_id.clone())
                .unwrap_or_default(),
            message: o.message.clone().unwrap_or_default(),
        },
        |o| format!("{} {}", o.operation, o.status),
    );
    output::print_output(&out, global.quiet);

    let unsynced = outcomes.iter().filter(|o| o.status != "synced").count();
    if unsynced > 0 {
        return Err(CliError::SyncIncomplete {
            unsynced,
            total: outcomes.len(),
        });
    }
    Ok(())
}
