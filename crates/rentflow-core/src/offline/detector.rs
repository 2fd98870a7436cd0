// ── Offline detector & operation queue ──
//
// Tracks connectivity from two signals: the platform's online/offline
// hint (weak) and the backend health probe (authoritative). Mutations
// queued while offline are replayed FIFO once the probe succeeds, one at
// a time, with linear backoff per operation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rentflow_api::{TemplateClient, TemplateRequest};

use super::operation::{OperationKind, PendingOperation};
use super::state::{ConnectivityState, OfflineEvent, Phase};
use super::timers::{TimerRegistry, TimerTask};
use crate::config::{OfflineConfig, PipelineConfig};
use crate::error::CoreError;

const EVENT_CHANNEL_SIZE: usize = 256;

/// Which path requested a health probe; failures are reported
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeTrigger {
    Automatic,
    Manual,
}

/// Outcome of replaying one operation.
enum Replay {
    Synced(Option<String>),
    /// Unknown kind or missing target id.
    Unsupported,
}

struct Status {
    phase: Phase,
    last_online_time: Option<DateTime<Utc>>,
    /// Automatic probing is underway after an online hint. Cleared once
    /// the backend answers or the platform reports offline.
    probing: bool,
}

// ── OfflineDetector ──────────────────────────────────────────────────

/// Connectivity tracker and pending-operation queue.
///
/// Cheaply cloneable via `Arc<DetectorInner>`.
#[derive(Clone)]
pub struct OfflineDetector {
    inner: Arc<DetectorInner>,
}

struct DetectorInner {
    client: TemplateClient,
    config: OfflineConfig,
    status: Mutex<Status>,
    state: watch::Sender<ConnectivityState>,
    events: broadcast::Sender<OfflineEvent>,
    queue: Mutex<VecDeque<PendingOperation>>,
    next_seq: AtomicU64,
    /// Operations popped from the queue whose dispatch has not settled.
    in_flight: AtomicUsize,
    /// Serializes dispatches so at most one replay is on the wire.
    drain_lock: tokio::sync::Mutex<()>,
    retry_timers: TimerRegistry,
    probe_timers: TimerRegistry,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineDetector {
    /// Create a detector. `online` is the platform's connectivity signal
    /// at construction time.
    pub fn new(client: TemplateClient, config: OfflineConfig, online: bool) -> Self {
        let phase = if online { Phase::Online } else { Phase::Offline };
        let last_online_time = online.then(Utc::now);
        let (state, _) = watch::channel(ConnectivityState::from_phase(phase, last_online_time, 0));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        Self {
            inner: Arc::new(DetectorInner {
                client,
                config,
                status: Mutex::new(Status {
                    phase,
                    last_online_time,
                    probing: false,
                }),
                state,
                events,
                queue: Mutex::new(VecDeque::new()),
                next_seq: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                drain_lock: tokio::sync::Mutex::new(()),
                retry_timers: TimerRegistry::new(&cancel),
                probe_timers: TimerRegistry::new(&cancel),
                cancel,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn from_config(config: &PipelineConfig, online: bool) -> Result<Self, CoreError> {
        Ok(Self::new(config.build_client()?, config.offline.clone(), online))
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.inner.config
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to connectivity snapshots.
    pub fn state(&self) -> watch::Receiver<ConnectivityState> {
        self.inner.state.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<OfflineEvent> {
        self.inner.events.subscribe()
    }

    /// Current connectivity plus pending count, computed fresh.
    pub fn get_offline_stats(&self) -> ConnectivityState {
        let status = self.lock_status();
        ConnectivityState::from_phase(
            status.phase,
            status.last_online_time,
            self.pending_operations_count(),
        )
    }

    /// `true` only once the health probe has confirmed reachability.
    pub fn is_online(&self) -> bool {
        self.lock_status().phase == Phase::Online
    }

    pub fn pending_operations_count(&self) -> usize {
        self.lock_queue().len()
            + self.inner.in_flight.load(Ordering::SeqCst)
            + self.inner.retry_timers.len()
    }

    /// Operations waiting in the queue, in replay order.
    pub fn pending_operations(&self) -> Vec<PendingOperation> {
        self.lock_queue().iter().cloned().collect()
    }

    // ── Queue ────────────────────────────────────────────────────────

    /// Append `op` to the replay queue. Returns `false` when offline
    /// queueing is disabled.
    ///
    /// Queueing never triggers a drain; replay starts on the next
    /// confirmed reconnect or an explicit
    /// [`process_pending_operations`](Self::process_pending_operations).
    pub fn queue_operation(&self, mut op: PendingOperation) -> bool {
        if !self.inner.config.enable_offline_queue {
            debug!(kind = %op.kind, "offline queue disabled, operation ignored");
            return false;
        }
        op.seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
        debug!(operation = %op.id, kind = %op.kind, seq = op.seq, "operation queued");
        self.lock_queue().push_back(op);
        self.publish();
        true
    }

    /// Discard queued operations and pending retries without delivering
    /// them. A dispatch already on the wire is left to settle.
    pub fn clear_pending_operations(&self) {
        let dropped = {
            let mut queue = self.lock_queue();
            let n = queue.len();
            queue.clear();
            n
        };
        self.inner.retry_timers.cancel_all();
        info!(dropped, "pending operations cleared");
        self.publish();
    }

    /// Replay queued operations FIFO while connectivity stays confirmed.
    /// Returns the number of operations synced in this pass.
    pub async fn process_pending_operations(&self) -> usize {
        if !self.is_online() {
            debug!("drain skipped, connectivity not confirmed");
            return 0;
        }

        let _drain = self.inner.drain_lock.lock().await;
        let mut synced = 0usize;
        let mut attempted = 0usize;

        while self.is_online() {
            let Some(op) = self.pop_front() else {
                break;
            };
            attempted += 1;
            if self.replay(op).await {
                synced += 1;
            }
        }

        if attempted > 0 {
            let remaining = self.pending_operations_count();
            info!(synced, remaining, "queue drain finished");
            self.emit(OfflineEvent::QueueDrained { synced, remaining });
        }
        synced
    }

    // ── Connectivity ─────────────────────────────────────────────────

    /// Feed the platform's online/offline hint.
    ///
    /// Going online only moves to `Connecting` and starts a health probe;
    /// the queue drains once the probe succeeds.
    pub fn set_online_hint(&self, online: bool) {
        let (previous, start_probing) = {
            let mut status = self.lock_status();
            let previous = status.phase;
            let start_probing = online && previous != Phase::Online && !status.probing;
            if !online {
                status.phase = Phase::Offline;
                status.probing = false;
            } else if start_probing {
                status.phase = Phase::Connecting;
                status.probing = true;
            }
            (previous, start_probing)
        };

        // Repeated hints while already probing or online change nothing.
        if !online && previous != Phase::Offline {
            info!("platform reports offline");
            self.inner.probe_timers.cancel_all();
            self.emit(OfflineEvent::WentOffline);
            self.publish();
        } else if start_probing {
            info!("platform reports online, probing backend");
            self.emit(OfflineEvent::Reconnecting);
            self.publish();
            self.schedule_probe(Duration::ZERO);
        }
    }

    /// Manually probe the backend. On success the detector goes online
    /// and drains the queue.
    pub async fn retry_connection(&self) -> Result<(), CoreError> {
        {
            let mut status = self.lock_status();
            if status.phase != Phase::Online {
                status.phase = Phase::Connecting;
            }
        }
        self.publish();
        self.check_connection(ProbeTrigger::Manual).await
    }

    /// Consume a platform connectivity signal until shutdown.
    pub fn listen(&self, mut hint: watch::Receiver<bool>) {
        let this = self.clone();
        let cancel = self.inner.cancel.child_token();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = hint.changed() => {
                        if changed.is_err() {
                            debug!("connectivity hint source closed");
                            break;
                        }
                        let online = *hint.borrow_and_update();
                        this.set_online_hint(online);
                    }
                }
            }
        });
        self.inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
    }

    /// Stop listening and cancel every retry and probe timer.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        self.inner.retry_timers.shutdown();
        self.inner.probe_timers.shutdown();

        let handles: Vec<JoinHandle<()>> = self
            .inner
            .task_handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        debug!("offline detector shut down");
        self.publish();
    }

    // ── Probing ──────────────────────────────────────────────────────

    async fn check_connection(&self, trigger: ProbeTrigger) -> Result<(), CoreError> {
        match self
            .inner
            .client
            .check_health(&self.inner.config.health_path)
            .await
        {
            Ok(()) => {
                {
                    let mut status = self.lock_status();
                    status.phase = Phase::Online;
                    status.last_online_time = Some(Utc::now());
                    status.probing = false;
                }
                self.inner.probe_timers.cancel_all();
                info!("backend reachable");
                self.emit(OfflineEvent::BackOnline);
                self.publish();
                self.process_pending_operations().await;
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                let message = err.user_message();
                match trigger {
                    ProbeTrigger::Automatic => {
                        warn!(error = %err, "health probe failed");
                        self.emit(OfflineEvent::ConnectionCheckFailed { message });
                        if self.lock_status().phase == Phase::Connecting {
                            self.schedule_probe(self.inner.config.probe_retry_delay);
                        }
                    }
                    ProbeTrigger::Manual => {
                        warn!(error = %err, "manual connection retry failed");
                        {
                            let mut status = self.lock_status();
                            if status.phase == Phase::Connecting && !status.probing {
                                status.phase = Phase::Offline;
                            }
                        }
                        self.emit(OfflineEvent::ManualRetryFailed { message });
                    }
                }
                self.publish();
                Err(err)
            }
        }
    }

    fn schedule_probe(&self, delay: Duration) {
        self.inner.probe_timers.cancel_all();
        self.inner
            .probe_timers
            .schedule(delay, self.clone().automatic_probe());
    }

    fn automatic_probe(self) -> TimerTask {
        Box::pin(async move {
            if self.lock_status().phase != Phase::Connecting {
                return;
            }
            let _ = self.check_connection(ProbeTrigger::Automatic).await;
        })
    }

    // ── Replay ───────────────────────────────────────────────────────

    /// Dispatch one popped operation. The caller holds the drain lock
    /// and has already counted `op` as in flight.
    async fn replay(&self, op: PendingOperation) -> bool {
        debug!(operation = %op.id, kind = %op.kind, attempt = op.attempt_count, "replaying");
        let result = self.dispatch(&op).await;
        let synced = match result {
            Ok(Replay::Synced(template_id)) => {
                info!(operation = %op.id, kind = %op.kind, "operation synced");
                self.emit(OfflineEvent::OperationSynced {
                    operation: op.id,
                    kind: op.kind,
                    template_id,
                });
                true
            }
            Ok(Replay::Unsupported) => {
                warn!(operation = %op.id, kind = %op.kind, "unsupported operation dropped");
                false
            }
            Err(e) => {
                self.retry_later(op, &CoreError::from(e));
                false
            }
        };
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.publish();
        synced
    }

    async fn dispatch(&self, op: &PendingOperation) -> Result<Replay, rentflow_api::Error> {
        let client = &self.inner.client;
        let body = TemplateRequest::from(&op.payload);
        match (op.kind, op.target_id.as_deref()) {
            (OperationKind::Create, _) => {
                let created = client.create_template(&body).await?;
                Ok(Replay::Synced(Some(created.id)))
            }
            (OperationKind::Update, Some(id)) => {
                let updated = client.update_template(id, &body).await?;
                Ok(Replay::Synced(Some(updated.id)))
            }
            (OperationKind::Delete, Some(id)) => {
                client.delete_template(id).await?;
                Ok(Replay::Synced(Some(id.to_owned())))
            }
            (OperationKind::Update | OperationKind::Delete, None) | (OperationKind::Unknown, _) => {
                Ok(Replay::Unsupported)
            }
        }
    }

    /// Count the failed attempt and either schedule a retry after
    /// `retry_delay * attempt_count` or drop the operation.
    fn retry_later(&self, mut op: PendingOperation, err: &CoreError) {
        op.attempt_count += 1;

        if op.attempt_count > self.inner.config.max_retries {
            warn!(
                operation = %op.id,
                kind = %op.kind,
                attempts = op.attempt_count,
                error = %err,
                "retries exhausted, operation dropped"
            );
            self.emit(OfflineEvent::OperationDropped {
                operation: op.id,
                kind: op.kind,
                attempts: op.attempt_count,
                message: err.user_message(),
            });
            return;
        }

        let delay = self
            .inner
            .config
            .retry_delay
            .checked_mul(op.attempt_count)
            .unwrap_or(Duration::MAX);
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(operation = %op.id, attempt = op.attempt_count, delay_ms, error = %err, "retry scheduled");
        self.emit(OfflineEvent::OperationRetryScheduled {
            operation: op.id,
            attempt: op.attempt_count,
            delay_ms,
        });
        self.inner
            .retry_timers
            .schedule(delay, self.clone().retry_fired(op));
    }

    /// Retry timer body: replay when online, otherwise park the
    /// operation back at its queue position for the next drain.
    fn retry_fired(self, op: PendingOperation) -> TimerTask {
        Box::pin(async move {
            if !self.is_online() {
                debug!(operation = %op.id, "retry due while offline, requeued");
                self.requeue(op);
                self.publish();
                return;
            }
            self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
            let _drain = self.inner.drain_lock.lock().await;
            if !self.is_online() {
                self.requeue(op);
                self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.publish();
                return;
            }
            self.replay(op).await;
        })
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Put `op` back ahead of everything queued after it. The queue stays
    /// sorted by `seq` since appends take increasing numbers.
    fn requeue(&self, op: PendingOperation) {
        let mut queue = self.lock_queue();
        let at = queue.partition_point(|queued| queued.seq < op.seq);
        queue.insert(at, op);
    }

    fn pop_front(&self) -> Option<PendingOperation> {
        let mut queue = self.lock_queue();
        let op = queue.pop_front()?;
        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(op)
    }

    fn publish(&self) {
        let snapshot = self.get_offline_stats();
        self.inner.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn emit(&self, event: OfflineEvent) {
        // No receivers is fine.
        let _ = self.inner.events.send(event);
    }

    fn lock_status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.inner
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, VecDeque<PendingOperation>> {
        self.inner
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
