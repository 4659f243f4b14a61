//! The shape document: either a local list the editor owns, or a
//! read-only mirror of an external entity store.
//!
//! In store-backed mode every write goes to the store and the mirror is
//! rebuilt wholesale when a change notification arrives. Notifications
//! may fire on any thread; they are forwarded over a channel and only
//! applied when the owner calls [`Document::sync`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use anyhow::anyhow;
use diagrammer_geometry::Point;
use tracing::{debug, trace, warn};

use crate::projection::{entity_from_shape, shape_from_entity};
use crate::shapes::ShapeRecord;
use crate::store::{ChangeEvent, Entity, EntityId, EntityStore, SubscriptionId};

/// Topmost record containing `p`, scanning from the end of the list
pub fn hit_test(shapes: &[ShapeRecord], p: Point) -> Option<usize> {
    shapes.iter().rposition(|shape| shape.contains(p))
}

/// Shape list owned by the editor
#[derive(Debug, Default, Clone)]
pub struct LocalDocument {
    shapes: Vec<ShapeRecord>,
}

impl LocalDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: Vec<ShapeRecord>) -> Self {
        Self { shapes }
    }

    pub fn shapes(&self) -> &[ShapeRecord] {
        &self.shapes
    }

    pub fn push(&mut self, record: ShapeRecord) -> usize {
        self.shapes.push(record);
        self.shapes.len() - 1
    }

    /// Insert at `index`; fails if `index > len`
    pub fn insert(&mut self, index: usize, record: ShapeRecord) -> bool {
        if index > self.shapes.len() {
            return false;
        }
        self.shapes.insert(index, record);
        true
    }

    pub fn replace(&mut self, index: usize, record: ShapeRecord) -> bool {
        match self.shapes.get_mut(index) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<ShapeRecord> {
        (index < self.shapes.len()).then(|| self.shapes.remove(index))
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }
}

/// Read-only mirror of an entity store
pub struct StoreBackedDocument {
    store: Arc<dyn EntityStore>,
    /// Mirrored records in store order
    shapes: Vec<ShapeRecord>,
    /// Fast lookup by entity id
    by_id: HashMap<EntityId, usize>,
    subscription: SubscriptionId,
    changes: Receiver<ChangeEvent>,
    default_stroke: f32,
}

impl StoreBackedDocument {
    /// Subscribe to `store` and take an initial snapshot
    pub fn attach(store: Arc<dyn EntityStore>, default_stroke: f32) -> Self {
        let (tx, rx) = mpsc::channel();
        let subscription = store.subscribe(Arc::new(move |event: &ChangeEvent| {
            tx.send(event.clone()).map_err(|_| anyhow!("document detached"))
        }));

        let mut doc = Self {
            store,
            shapes: Vec::new(),
            by_id: HashMap::new(),
            subscription,
            changes: rx,
            default_stroke,
        };
        doc.rebuild();
        doc
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn shapes(&self) -> &[ShapeRecord] {
        &self.shapes
    }

    /// Discard the mirror and re-read every entity from the store
    pub fn rebuild(&mut self) {
        self.shapes.clear();
        self.by_id.clear();

        for entity in self.store.get_all() {
            let idx = self.shapes.len();
            self.by_id.insert(entity.id, idx);
            self.shapes.push(shape_from_entity(&entity, self.default_stroke));
        }
        debug!(shapes = self.shapes.len(), "rebuilt from store");
    }

    /// Drain pending notifications; rebuild once if there were any.
    /// Returns the number of notifications consumed.
    pub fn drain_changes(&mut self) -> usize {
        let mut consumed = 0;
        while let Ok(event) = self.changes.try_recv() {
            trace!(kind = ?event.kind, ids = event.ids.len(), "store change");
            consumed += 1;
        }
        if consumed > 0 {
            self.rebuild();
        }
        consumed
    }

    /// Position of the record mirroring `id`. Falls back to a linear scan
    /// if the id map misses.
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        if let Some(&idx) = self.by_id.get(&id) {
            return Some(idx);
        }
        let found = self.shapes.iter().position(|r| r.external_id == Some(id));
        if found.is_some() {
            debug!(%id, "id map miss resolved by scan");
        }
        found
    }
}

impl Drop for StoreBackedDocument {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

impl std::fmt::Debug for StoreBackedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreBackedDocument")
            .field("shapes", &self.shapes.len())
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

/// A new record handed to [`Document::append`]
#[derive(Debug, Clone, PartialEq)]
pub enum Appended {
    /// Added to the local list at this index
    Local(usize),
    /// Submitted to the store; visible after the next rebuild
    Submitted(Entity),
}

/// The shape list the editor works on
#[derive(Debug)]
pub enum Document {
    Local(LocalDocument),
    Store(StoreBackedDocument),
}

impl Default for Document {
    fn default() -> Self {
        Document::Local(LocalDocument::new())
    }
}

impl Document {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn backed_by(store: Arc<dyn EntityStore>, default_stroke: f32) -> Self {
        Document::Store(StoreBackedDocument::attach(store, default_stroke))
    }

    pub fn shapes(&self) -> &[ShapeRecord] {
        match self {
            Document::Local(doc) => doc.shapes(),
            Document::Store(doc) => doc.shapes(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&ShapeRecord> {
        self.shapes().get(index)
    }

    pub fn len(&self) -> usize {
        self.shapes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes().is_empty()
    }

    pub fn is_store_backed(&self) -> bool {
        matches!(self, Document::Store(_))
    }

    pub fn store(&self) -> Option<&Arc<dyn EntityStore>> {
        match self {
            Document::Local(_) => None,
            Document::Store(doc) => Some(doc.store()),
        }
    }

    pub fn hit_test(&self, p: Point) -> Option<usize> {
        hit_test(self.shapes(), p)
    }

    /// Position of the record with this external id
    pub fn index_of(&self, id: EntityId) -> Option<usize> {
        match self {
            Document::Local(doc) => doc.shapes().iter().position(|r| r.external_id == Some(id)),
            Document::Store(doc) => doc.index_of(id),
        }
    }

    /// Apply pending store notifications. Returns true if the mirror was rebuilt.
    pub fn sync(&mut self) -> bool {
        match self {
            Document::Local(_) => false,
            Document::Store(doc) => doc.drain_changes() > 0,
        }
    }

    /// Add a freshly created record
    pub fn append(&mut self, record: ShapeRecord) -> Appended {
        match self {
            Document::Local(doc) => Appended::Local(doc.push(record)),
            Document::Store(doc) => {
                let entity = entity_from_shape(&record.with_external_id(EntityId::new()));
                debug!(id = %entity.id, "submitting new entity");
                doc.store().add_entity(entity.clone());
                Appended::Submitted(entity)
            }
        }
    }

    /// Write `record` over the record at `index`.
    ///
    /// A record with an external id in store mode is written to the store by
    /// id and `index` is ignored. Otherwise the local slot is replaced; a
    /// stale index is a no-op.
    pub fn replace(&mut self, index: usize, record: ShapeRecord) -> bool {
        match (self, record.external_id) {
            (Document::Store(doc), Some(_)) => {
                doc.store().update_entity(entity_from_shape(&record));
                true
            }
            (Document::Store(_), None) => {
                warn!(index, "record without entity id cannot be written to a store");
                false
            }
            (Document::Local(doc), _) => doc.replace(index, record),
        }
    }

    /// Re-insert a record, as when undoing a removal.
    ///
    /// `entity` is the snapshot to resubmit in store mode; without one the
    /// record is projected again.
    pub fn restore(&mut self, index: usize, record: &ShapeRecord, entity: Option<&Entity>) -> bool {
        match (self, record.external_id) {
            (Document::Store(doc), Some(_)) => {
                let entity = entity.cloned().unwrap_or_else(|| entity_from_shape(record));
                doc.store().add_entity(entity);
                true
            }
            (Document::Store(_), None) => {
                warn!(index, "record without entity id cannot be restored to a store");
                false
            }
            (Document::Local(doc), _) => doc.insert(index, record.clone()),
        }
    }

    /// Remove the record previously captured as `record` from `index`
    pub fn remove(&mut self, index: usize, record: &ShapeRecord) -> bool {
        match (self, record.external_id) {
            (Document::Store(doc), Some(id)) => {
                doc.store().remove_entity(id);
                true
            }
            (Document::Store(_), None) => {
                warn!(index, "record without entity id cannot be removed from a store");
                false
            }
            (Document::Local(doc), _) => doc.remove(index).is_some(),
        }
    }

    /// Remove everything. In store mode the removals are sent as one batch.
    pub fn clear(&mut self) {
        match self {
            Document::Local(doc) => doc.clear(),
            Document::Store(doc) => {
                let store = doc.store();
                store.begin_batch();
                for id in doc.shapes().iter().filter_map(|r| r.external_id) {
                    store.remove_entity(id);
                }
                store.end_batch();
            }
        }
    }
}
