// ── Optimistic mutation service ──
//
// Applies template changes to the local store before the backend
// answers, then confirms or rolls back. Subscribers see a fixed number
// of notifications per outcome:
//
//   create  ok 2 / err 2
//   update  ok 2 / err 2
//   delete  ok 1 / err 2
//
// Rollback and notification always happen before the error is handed
// back to the caller. A mutation future dropped before the backend
// answers rolls back the same way, without the error callback.

use std::sync::{Arc, PoisonError, RwLock};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use rentflow_api::{TemplateClient, TemplateRequest};

use crate::config::{MutationConfig, PipelineConfig};
use crate::error::CoreError;
use crate::model::{EntityId, Template, TemplatePatch};
use crate::store::{Removed, Snapshot, Subscription, TemplateStore};

/// Side channel receiving the localized message of every failed mutation.
pub type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Owns the template collection and every write to it.
///
/// Cheaply cloneable; clones share the same store and subscribers.
#[derive(Clone)]
pub struct MutationService {
    inner: Arc<MutationInner>,
}

struct MutationInner {
    client: TemplateClient,
    store: TemplateStore,
    config: MutationConfig,
    on_error: RwLock<Option<ErrorCallback>>,
    /// Per-id locks, only populated when `serialize_same_id` is set.
    id_locks: DashMap<EntityId, Arc<Mutex<()>>>,
}

impl MutationService {
    pub fn new(client: TemplateClient, config: MutationConfig) -> Self {
        Self {
            inner: Arc::new(MutationInner {
                client,
                store: TemplateStore::new(),
                config,
                on_error: RwLock::new(None),
                id_locks: DashMap::new(),
            }),
        }
    }

    /// Build the HTTP client from `config` and wrap it.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, CoreError> {
        Ok(Self::new(config.build_client()?, config.mutation.clone()))
    }

    /// Install the error callback, replacing any previous one.
    pub fn set_error_callback<F>(&self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        *self
            .inner
            .on_error
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn with_error_callback<F>(self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.set_error_callback(callback);
        self
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn store(&self) -> &TemplateStore {
        &self.inner.store
    }

    /// Register a listener called synchronously at every notify point.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Snapshot<Template>) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(listener)
    }

    pub fn templates(&self) -> Snapshot<Template> {
        self.inner.store.snapshot()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<Template>> {
        self.inner.store.get(id)
    }

    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// `true` while `id` names an unconfirmed optimistic record.
    pub fn is_optimistic(&self, id: &EntityId) -> bool {
        id.is_temporary() && self.inner.store.templates.contains(id)
    }

    pub fn version(&self) -> u64 {
        self.inner.store.version()
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Replace the collection with the backend's list. Notifies once.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let list = self.inner.client.list_templates().await?;
        let count = list.len();
        self.inner.store.templates.reset(list.into_iter().map(|r| {
            let t = Template::from(r);
            (t.id.clone(), t)
        }));
        self.inner.store.mark_refreshed();
        self.inner.store.notify();
        info!(count, "templates refreshed");
        Ok(count)
    }

    /// Load one template into the collection. Notifies once.
    pub async fn fetch(&self, id: &EntityId) -> Result<Template, CoreError> {
        let template = Template::from(self.inner.client.get_template(&id.to_string()).await?);
        self.inner
            .store
            .templates
            .upsert(template.id.clone(), template.clone());
        self.inner.store.notify();
        Ok(template)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create a template under a temporary id, then swap in the server
    /// record.
    pub async fn create(&self, patch: TemplatePatch) -> Result<Template, CoreError> {
        let store = &self.inner.store;
        let temp_id = EntityId::temporary();

        store
            .templates
            .upsert(temp_id.clone(), Template::optimistic(temp_id.clone(), &patch));
        store.notify();
        debug!(id = %temp_id, "optimistic create applied");
        let pending = Pending::new(
            store,
            Undo::Create {
                temp_id: temp_id.clone(),
            },
        );

        match self
            .inner
            .client
            .create_template(&TemplateRequest::from(&patch))
            .await
        {
            Ok(resp) => {
                pending.confirm();
                let confirmed = Template::from(resp);
                store
                    .templates
                    .replace(&temp_id, confirmed.id.clone(), confirmed.clone());
                store.notify();
                debug!(temp = %temp_id, id = %confirmed.id, "create confirmed");
                Ok(confirmed)
            }
            Err(e) => {
                pending.revert();
                Err(self.rolled_back("create", &temp_id, e.into()))
            }
        }
    }

    /// Apply `patch` to an existing template.
    pub async fn update(&self, id: &EntityId, patch: TemplatePatch) -> Result<Template, CoreError> {
        let _guard = self.serialize(id).await;
        let store = &self.inner.store;

        let Some(prior) = store.get(id) else {
            return Err(CoreError::TemplateNotFound { id: id.to_string() });
        };

        let mut patched = Template::clone(&prior);
        patched.apply(&patch);
        store.templates.upsert(id.clone(), patched);
        store.notify();
        debug!(id = %id, "optimistic update applied");
        let pending = Pending::new(
            store,
            Undo::Update {
                id: id.clone(),
                prior,
            },
        );

        let result = self
            .inner
            .client
            .update_template(&id.to_string(), &TemplateRequest::from(&patch))
            .await;

        match result {
            Ok(resp) => {
                pending.confirm();
                let confirmed = Template::from(resp);
                store
                    .templates
                    .replace(id, confirmed.id.clone(), confirmed.clone());
                store.notify();
                Ok(confirmed)
            }
            Err(e) => {
                pending.revert();
                Err(self.rolled_back("update", id, e.into()))
            }
        }
    }

    /// Remove a template; restore it at its old position on failure.
    pub async fn delete(&self, id: &EntityId) -> Result<(), CoreError> {
        let _guard = self.serialize(id).await;
        let store = &self.inner.store;

        let Some(removed) = store.templates.remove(id) else {
            return Err(CoreError::TemplateNotFound { id: id.to_string() });
        };
        store.notify();
        debug!(id = %id, "optimistic delete applied");
        let pending = Pending::new(
            store,
            Undo::Delete {
                id: id.clone(),
                removed,
            },
        );

        match self.inner.client.delete_template(&id.to_string()).await {
            Ok(()) => {
                pending.confirm();
                Ok(())
            }
            Err(e) => {
                pending.revert();
                Err(self.rolled_back("delete", id, e.into()))
            }
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Report a failure whose rollback has already been published.
    fn rolled_back(&self, op: &'static str, id: &EntityId, err: CoreError) -> CoreError {
        let message = err.user_message();
        warn!(op, id = %id, error = %err, "mutation rolled back");

        let callback = self
            .inner
            .on_error
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(&message);
        }
        err
    }

    /// Hold the per-id lock when same-id serialization is on.
    async fn serialize(&self, id: &EntityId) -> Option<IdGuard> {
        if !self.inner.config.serialize_same_id {
            return None;
        }
        let lock = Arc::clone(
            self.inner
                .id_locks
                .entry(id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        let guard = lock.lock_owned().await;
        Some(IdGuard {
            guard: Some(guard),
            id: id.clone(),
            inner: Arc::clone(&self.inner),
        })
    }
}

/// Releases a per-id lock and prunes it once nobody else waits on it.
struct IdGuard {
    guard: Option<OwnedMutexGuard<()>>,
    id: EntityId,
    inner: Arc<MutationInner>,
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.inner
            .id_locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// How to take back one optimistic change.
enum Undo {
    Create { temp_id: EntityId },
    Update { id: EntityId, prior: Arc<Template> },
    Delete { id: EntityId, removed: Removed<Template> },
}

impl Undo {
    fn id(&self) -> &EntityId {
        match self {
            Self::Create { temp_id } => temp_id,
            Self::Update { id, .. } | Self::Delete { id, .. } => id,
        }
    }

    fn apply(self, store: &TemplateStore) {
        match self {
            Self::Create { temp_id } => {
                store.templates.remove(&temp_id);
            }
            Self::Update { id, prior } => {
                store.templates.upsert(id, Template::clone(&prior));
            }
            Self::Delete { id, removed } => store.templates.restore(id, removed),
        }
        store.notify();
    }
}

/// An optimistic change awaiting the backend. Dropping it unsettled
/// reverts the change and notifies subscribers.
struct Pending<'a> {
    store: &'a TemplateStore,
    undo: Option<Undo>,
}

impl<'a> Pending<'a> {
    fn new(store: &'a TemplateStore, undo: Undo) -> Self {
        Self {
            store,
            undo: Some(undo),
        }
    }

    fn confirm(mut self) {
        self.undo = None;
    }

    fn revert(mut self) {
        if let Some(undo) = self.undo.take() {
            undo.apply(self.store);
        }
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            warn!(id = %undo.id(), "mutation abandoned before the backend answered, rolled back");
            undo.apply(self.store);
        }
    }
}
