//! Entity store backed by an automerge document.
//!
//! Layout: every entity is a map directly under `ROOT`, keyed
//! `entity:<id>`, holding a `type` string, a `seq` insertion number and an
//! `attrs` map; list attributes become automerge lists. Entities must not
//! share a container object: two replicas each creating one conflict on
//! merge and one side is lost. Concurrent edits merged in through
//! [`AutomergeStore::merge`] are announced as a reset.

use std::collections::BTreeMap;

use anyhow::Result;
use automerge::{Automerge, ObjId, ObjType, ROOT, ReadDoc, ScalarValue, Value, transaction::Transactable};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::{AttrValue, ChangeEvent, ChangeHandler, ChangeKind, Entity, EntityId, EntityStore, Notifier, SubscriptionId};

const ENTITY_PREFIX: &str = "entity:";
const NEXT_SEQ_KEY: &str = "next_seq";

pub struct AutomergeStore {
    doc: Mutex<Automerge>,
    notifier: Notifier,
}

impl AutomergeStore {
    pub fn new() -> Self {
        Self::from_automerge(Automerge::new())
    }

    pub fn from_automerge(doc: Automerge) -> Self {
        Self {
            doc: Mutex::new(doc),
            notifier: Notifier::default(),
        }
    }

    /// Load a store from bytes produced by [`AutomergeStore::save`]
    pub fn load(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_automerge(Automerge::load(bytes)?))
    }

    pub fn save(&self) -> Vec<u8> {
        self.doc.lock().save()
    }

    /// Clone the automerge document (for sync)
    pub fn clone_automerge(&self) -> Automerge {
        self.doc.lock().clone()
    }

    /// Merge another replica's changes and announce a reset
    pub fn merge(&self, other: &mut Automerge) -> Result<()> {
        self.doc.lock().merge(other)?;
        self.notifier.emit(ChangeEvent::new(ChangeKind::Reset, Vec::new()));
        Ok(())
    }

    fn try_get_all(&self) -> Result<Vec<Entity>> {
        read_entities(&self.doc.lock())
    }

    fn try_put(&self, entity: &Entity) -> Result<bool> {
        put_entity(&mut self.doc.lock(), entity)
    }

    fn try_remove(&self, id: EntityId) -> Result<bool> {
        let mut doc = self.doc.lock();
        let key = entity_key(id);
        if doc.get(ROOT, key.as_str())?.is_none() {
            return Ok(false);
        }
        let mut tx = doc.transaction();
        tx.delete(ROOT, key.as_str())?;
        tx.commit();
        Ok(true)
    }
}

impl Default for AutomergeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore for AutomergeStore {
    fn get_all(&self) -> Vec<Entity> {
        self.try_get_all().unwrap_or_else(|e| {
            warn!("failed to read entities: {e:#}");
            Vec::new()
        })
    }

    fn add_entity(&self, entity: Entity) {
        match self.try_put(&entity) {
            Ok(_) => self.notifier.emit(ChangeEvent::single(ChangeKind::Added, entity.id)),
            Err(e) => warn!(id = %entity.id, "failed to add entity: {e:#}"),
        }
    }

    fn update_entity(&self, entity: Entity) {
        match self.try_put(&entity) {
            Ok(true) => self.notifier.emit(ChangeEvent::single(ChangeKind::Updated, entity.id)),
            Ok(false) => self.notifier.emit(ChangeEvent::single(ChangeKind::Added, entity.id)),
            Err(e) => warn!(id = %entity.id, "failed to update entity: {e:#}"),
        }
    }

    fn remove_entity(&self, id: EntityId) {
        match self.try_remove(id) {
            Ok(true) => self.notifier.emit(ChangeEvent::single(ChangeKind::Removed, id)),
            Ok(false) => debug!(%id, "remove of unknown entity ignored"),
            Err(e) => warn!(%id, "failed to remove entity: {e:#}"),
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

fn entity_key(id: EntityId) -> String {
    format!("{ENTITY_PREFIX}{id}")
}

/// Write `entity`, replacing any previous version. Returns whether it existed.
fn put_entity(doc: &mut Automerge, entity: &Entity) -> Result<bool> {
    let key = entity_key(entity.id);
    let mut tx = doc.transaction();

    let previous_seq = match tx.get(ROOT, key.as_str())? {
        Some((_, old)) => Some(get_i64(&tx, &old, "seq")?.unwrap_or(0)),
        None => None,
    };
    let seq = match previous_seq {
        Some(seq) => seq,
        None => {
            let next = get_i64(&tx, &ROOT, NEXT_SEQ_KEY)?.unwrap_or(0);
            tx.put(ROOT, NEXT_SEQ_KEY, next + 1)?;
            next
        }
    };

    let obj = tx.put_object(ROOT, key.as_str(), ObjType::Map)?;
    tx.put(&obj, "type", entity.entity_type.as_str())?;
    tx.put(&obj, "seq", seq)?;
    let attrs = tx.put_object(&obj, "attrs", ObjType::Map)?;
    for (name, value) in &entity.attributes {
        write_attr(&mut tx, &attrs, name, value)?;
    }
    tx.commit();

    Ok(previous_seq.is_some())
}

fn get_i64<R: ReadDoc>(doc: &R, obj: &ObjId, key: &str) -> Result<Option<i64>> {
    match doc.get(obj, key)? {
        Some((Value::Scalar(s), _)) => Ok(s.to_i64()),
        _ => Ok(None),
    }
}

fn write_attr<T: Transactable>(tx: &mut T, obj: &ObjId, key: &str, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Bool(b) => tx.put(obj, key, *b)?,
        AttrValue::Int(n) => tx.put(obj, key, *n)?,
        AttrValue::Float(f) => tx.put(obj, key, *f)?,
        AttrValue::Text(s) => tx.put(obj, key, s.as_str())?,
        AttrValue::List(items) => {
            let list = tx.put_object(obj, key, ObjType::List)?;
            for (i, item) in items.iter().enumerate() {
                insert_attr(tx, &list, i, item)?;
            }
        }
    }
    Ok(())
}

fn insert_attr<T: Transactable>(tx: &mut T, list: &ObjId, index: usize, value: &AttrValue) -> Result<()> {
    match value {
        AttrValue::Bool(b) => tx.insert(list, index, *b)?,
        AttrValue::Int(n) => tx.insert(list, index, *n)?,
        AttrValue::Float(f) => tx.insert(list, index, *f)?,
        AttrValue::Text(s) => tx.insert(list, index, s.as_str())?,
        AttrValue::List(items) => {
            let nested = tx.insert_object(list, index, ObjType::List)?;
            for (i, item) in items.iter().enumerate() {
                insert_attr(tx, &nested, i, item)?;
            }
        }
    }
    Ok(())
}

fn read_entities(doc: &Automerge) -> Result<Vec<Entity>> {
    let mut out = Vec::new();
    for key in doc.keys(ROOT) {
        let Some(raw_id) = key.strip_prefix(ENTITY_PREFIX) else {
            continue;
        };
        let id = match EntityId::parse(raw_id) {
            Ok(id) => id,
            Err(e) => {
                warn!(key = key.as_str(), "skipping entity with malformed id: {e:#}");
                continue;
            }
        };
        let Some((Value::Object(ObjType::Map), obj)) = doc.get(ROOT, key.as_str())? else {
            continue;
        };

        let entity_type = match doc.get(&obj, "type")? {
            Some((Value::Scalar(s), _)) => match s.as_ref() {
                ScalarValue::Str(t) => t.to_string(),
                _ => String::new(),
            },
            _ => String::new(),
        };

        let seq = get_i64(doc, &obj, "seq")?.unwrap_or(0);

        let mut attributes = BTreeMap::new();
        if let Some((_, attrs)) = doc.get(&obj, "attrs")? {
            for name in doc.keys(&attrs) {
                if let Some((value, child)) = doc.get(&attrs, name.as_str())? {
                    if let Some(attr) = read_attr(doc, value, &child)? {
                        attributes.insert(name, attr);
                    }
                }
            }
        }

        out.push((
            seq,
            Entity {
                id,
                entity_type,
                attributes,
            },
        ));
    }

    // Replicas can hand out the same seq concurrently; id breaks the tie.
    out.sort_by(|(a_seq, a), (b_seq, b)| a_seq.cmp(b_seq).then(a.id.cmp(&b.id)));
    Ok(out.into_iter().map(|(_, entity)| entity).collect())
}

fn read_attr(doc: &Automerge, value: Value<'_>, obj: &ObjId) -> Result<Option<AttrValue>> {
    match value {
        Value::Scalar(s) => Ok(scalar_to_attr(s.as_ref())),
        Value::Object(ObjType::List) => {
            let len = doc.length(obj);
            let mut items = Vec::with_capacity(len);
            for i in 0..len {
                if let Some((item, child)) = doc.get(obj, i)? {
                    if let Some(attr) = read_attr(doc, item, &child)? {
                        items.push(attr);
                    }
                }
            }
            Ok(Some(AttrValue::List(items)))
        }
        Value::Object(_) => Ok(None),
    }
}

fn scalar_to_attr(s: &ScalarValue) -> Option<AttrValue> {
    match s {
        ScalarValue::Boolean(b) => Some(AttrValue::Bool(*b)),
        ScalarValue::Int(n) => Some(AttrValue::Int(*n)),
        ScalarValue::Uint(n) => Some(AttrValue::Int(*n as i64)),
        ScalarValue::F64(f) => Some(AttrValue::Float(*f)),
        ScalarValue::Str(t) => Some(AttrValue::Text(t.to_string())),
        _ => None,
    }
}
