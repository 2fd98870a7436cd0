// ── Ordered entity collection ──
//
// Insertion-ordered storage keyed by `EntityId`. Removals report the
// position they vacated so a rollback can put the record back exactly
// where it was.

use std::sync::{Arc, PoisonError, RwLock};

use indexmap::IndexMap;
use tokio::sync::watch;

use crate::model::EntityId;

/// Ordered, shared snapshot handed to subscribers and accessors.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// Records removed from the collection together with their old position.
#[derive(Debug, Clone)]
pub(crate) struct Removed<T> {
    pub index: usize,
    pub value: Arc<T>,
}

/// A concurrent, insertion-ordered collection for a single entity type.
///
/// Every mutation bumps a version counter observable through a `watch`
/// channel.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    entries: RwLock<IndexMap<EntityId, Arc<T>>>,
    version: watch::Sender<u64>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            entries: RwLock::new(IndexMap::new()),
            version,
        }
    }

    /// Insert or overwrite in place. Returns `true` if the id was new.
    pub(crate) fn upsert(&self, id: EntityId, entity: T) -> bool {
        let is_new = self.write().insert(id, Arc::new(entity)).is_none();
        self.bump_version();
        is_new
    }

    /// Remove by id, remembering the vacated position.
    pub(crate) fn remove(&self, id: &EntityId) -> Option<Removed<T>> {
        let removed = self
            .write()
            .shift_remove_full(id)
            .map(|(index, _, value)| Removed { index, value });
        if removed.is_some() {
            self.bump_version();
        }
        removed
    }

    /// Put a removed record back at its old position (clamped to the end).
    pub(crate) fn restore(&self, id: EntityId, removed: Removed<T>) {
        {
            let mut entries = self.write();
            entries.shift_remove(&id);
            let index = removed.index.min(entries.len());
            entries.shift_insert(index, id, removed.value);
        }
        self.bump_version();
    }

    /// Swap the record under `old` for `entity` under `new`, keeping the
    /// position of `old`. Appends when `old` is gone.
    pub(crate) fn replace(&self, old: &EntityId, new: EntityId, entity: T) {
        {
            let mut entries = self.write();
            let index = entries.shift_remove_full(old).map(|(i, _, _)| i);
            entries.shift_remove(&new);
            match index {
                Some(i) => {
                    let i = i.min(entries.len());
                    entries.shift_insert(i, new, Arc::new(entity));
                }
                None => {
                    entries.insert(new, Arc::new(entity));
                }
            }
        }
        self.bump_version();
    }

    /// Replace the whole content, keeping the given order.
    pub(crate) fn reset(&self, items: impl IntoIterator<Item = (EntityId, T)>) {
        let fresh: IndexMap<EntityId, Arc<T>> = items
            .into_iter()
            .map(|(id, entity)| (id, Arc::new(entity)))
            .collect();
        *self.write() = fresh;
        self.bump_version();
    }

    pub(crate) fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        self.read().get(id).map(Arc::clone)
    }

    pub(crate) fn contains(&self, id: &EntityId) -> bool {
        self.read().contains_key(id)
    }

    pub(crate) fn snapshot(&self) -> Snapshot<T> {
        Arc::new(self.read().values().map(Arc::clone).collect())
    }

    pub(crate) fn len(&self) -> usize {
        self.read().len()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn subscribe_version(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn read(&self) -> std::sync::RwLockReadGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, IndexMap<EntityId, Arc<T>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump_version(&self) {
        // `send_modify` updates unconditionally, even with zero receivers.
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(col: &EntityCollection<&'static str>) -> Vec<&'static str> {
        col.snapshot().iter().map(|v| **v).collect()
    }

    fn filled() -> EntityCollection<&'static str> {
        let col = EntityCollection::new();
        col.reset([
            (EntityId::from("a"), "a"),
            (EntityId::from("b"), "b"),
            (EntityId::from("c"), "c"),
        ]);
        col
    }

    #[test]
    fn upsert_returns_true_for_new_id() {
        let col = EntityCollection::new();
        assert!(col.upsert(EntityId::from("x"), 1));
        assert!(!col.upsert(EntityId::from("x"), 2));
        assert_eq!(*col.get(&EntityId::from("x")).unwrap(), 2);
    }

    #[test]
    fn remove_then_restore_keeps_position() {
        let col = filled();
        let removed = col.remove(&EntityId::from("b")).unwrap();
        assert_eq!(removed.index, 1);
        assert_eq!(ids(&col), vec!["a", "c"]);

        col.restore(EntityId::from("b"), removed);
        assert_eq!(ids(&col), vec!["a", "b", "c"]);
    }

    #[test]
    fn restore_clamps_when_collection_shrank() {
        let col = filled();
        let removed = col.remove(&EntityId::from("c")).unwrap();
        col.remove(&EntityId::from("b"));
        col.restore(EntityId::from("c"), removed);
        assert_eq!(ids(&col), vec!["a", "c"]);
    }

    #[test]
    fn replace_keeps_slot() {
        let col = filled();
        col.replace(&EntityId::from("b"), EntityId::from("z"), "z");
        assert_eq!(ids(&col), vec!["a", "z", "c"]);
        assert!(!col.contains(&EntityId::from("b")));
    }

    #[test]
    fn replace_missing_appends() {
        let col = filled();
        col.replace(&EntityId::from("gone"), EntityId::from("d"), "d");
        assert_eq!(ids(&col), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn every_mutation_bumps_version() {
        let col = EntityCollection::new();
        let rx = col.subscribe_version();
        col.upsert(EntityId::from("a"), 1);
        col.remove(&EntityId::from("a"));
        assert!(col.remove(&EntityId::from("a")).is_none());
        assert_eq!(col.version(), 2);
        assert_eq!(*rx.borrow(), 2);
        assert_eq!(col.len(), 0);
    }
}
