//! In-process entity store.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use super::{ChangeEvent, ChangeHandler, ChangeKind, Delivery, Entity, EntityId, EntityStore, Notifier, SubscriptionId};

#[derive(Default)]
struct Entries {
    /// Entity plus its insertion sequence number
    by_id: HashMap<EntityId, (u64, Entity)>,
    next_seq: u64,
}

/// Thread-safe in-memory store.
///
/// `get_all` returns entities in insertion order. Updating an entity keeps
/// its position; removing and re-adding it moves it to the end.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
    notifier: Notifier,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose notifications wait for [`MemoryStore::flush`]
    pub fn deferred() -> Self {
        Self {
            entries: Mutex::default(),
            notifier: Notifier::new(Delivery::Deferred),
        }
    }

    pub fn set_delivery(&self, delivery: Delivery) {
        self.notifier.set_delivery(delivery);
    }

    /// Deliver queued notifications. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        self.notifier.flush()
    }

    pub fn pending_notifications(&self) -> usize {
        self.notifier.pending()
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the whole contents and announce a reset
    pub fn reset(&self, entities: Vec<Entity>) {
        {
            let mut entries = self.entries.lock();
            entries.by_id.clear();
            for entity in entities {
                let seq = entries.next_seq;
                entries.next_seq += 1;
                entries.by_id.insert(entity.id, (seq, entity));
            }
        }
        self.notifier.emit(ChangeEvent::new(ChangeKind::Reset, Vec::new()));
    }
}

impl EntityStore for MemoryStore {
    fn get_all(&self) -> Vec<Entity> {
        let entries = self.entries.lock();
        let mut all: Vec<&(u64, Entity)> = entries.by_id.values().collect();
        all.sort_by_key(|(seq, _)| *seq);
        all.into_iter().map(|(_, entity)| entity.clone()).collect()
    }

    fn get(&self, id: EntityId) -> Option<Entity> {
        self.entries.lock().by_id.get(&id).map(|(_, entity)| entity.clone())
    }

    fn add_entity(&self, entity: Entity) {
        let id = entity.id;
        {
            let mut entries = self.entries.lock();
            let seq = match entries.by_id.get(&id) {
                Some((seq, _)) => *seq,
                None => {
                    let seq = entries.next_seq;
                    entries.next_seq += 1;
                    seq
                }
            };
            entries.by_id.insert(id, (seq, entity));
        }
        self.notifier.emit(ChangeEvent::single(ChangeKind::Added, id));
    }

    fn update_entity(&self, entity: Entity) {
        let id = entity.id;
        let kind = {
            let mut entries = self.entries.lock();
            match entries.by_id.get_mut(&id) {
                Some((_, existing)) => {
                    *existing = entity;
                    ChangeKind::Updated
                }
                None => {
                    let seq = entries.next_seq;
                    entries.next_seq += 1;
                    entries.by_id.insert(id, (seq, entity));
                    ChangeKind::Added
                }
            }
        };
        self.notifier.emit(ChangeEvent::single(kind, id));
    }

    fn remove_entity(&self, id: EntityId) {
        let removed = self.entries.lock().by_id.remove(&id).is_some();
        if removed {
            self.notifier.emit(ChangeEvent::single(ChangeKind::Removed, id));
        } else {
            debug!(%id, "remove of unknown entity ignored");
        }
    }

    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId {
        self.notifier.subscribe(handler)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn begin_batch(&self) {
        self.notifier.begin_batch();
    }

    fn end_batch(&self) {
        self.notifier.end_batch();
    }
}
