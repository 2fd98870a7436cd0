use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::collection::{EntityCollection, Snapshot};
use super::subject::{Subject, Subscription};
use crate::model::{EntityId, Template};

/// In-memory template state owned by the mutation service.
///
/// Readers get cheap `Arc` snapshots. Writes happen only inside the
/// mutation service, which decides when subscribers are notified.
pub struct TemplateStore {
    pub(crate) templates: EntityCollection<Template>,
    subject: Subject<Snapshot<Template>>,
    last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        let (last_refresh, _) = watch::channel(None);
        Self {
            templates: EntityCollection::new(),
            subject: Subject::new(),
            last_refresh,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot<Template> {
        self.templates.snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<Template>> {
        self.templates.get(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter, bumped on every change to the collection.
    pub fn version(&self) -> u64 {
        self.templates.version()
    }

    pub fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.templates.subscribe_version()
    }

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Register a listener called with the full snapshot at every notify
    /// point.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot<Template>) + Send + Sync + 'static,
    {
        self.subject.subscribe(listener)
    }

    pub fn listener_count(&self) -> usize {
        self.subject.listener_count()
    }

    pub(crate) fn notify(&self) {
        self.subject.notify(&self.snapshot());
    }

    pub(crate) fn mark_refreshed(&self) {
        self.last_refresh.send_replace(Some(Utc::now()));
    }
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}
