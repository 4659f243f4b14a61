//! External entity stores.
//!
//! A store holds untyped entities (a type tag plus named attributes) and
//! tells subscribers when they change. The editor never reads a store's
//! internals: it rebuilds its shape list from [`EntityStore::get_all`]
//! whenever a notification arrives.

mod crdt;
mod memory;
mod notify;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crdt::AutomergeStore;
pub use memory::MemoryStore;
pub use notify::{Delivery, Notifier};

/// Entity identifier - UUID so ids stay unique across stores and replicas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Attribute value stored on an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Numeric value as f64. Integers widen.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(n) => Some(*n as f64),
            AttrValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Numeric value as i64. Floats round toward zero.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(n) => Some(*n),
            AttrValue::Float(f) if f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Int(n)
    }
}

impl From<f64> for AttrValue {
    fn from(f: f64) -> Self {
        AttrValue::Float(f)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

/// A store record: id, type tag, and attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: String,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl Entity {
    pub fn new(id: EntityId, entity_type: impl Into<String>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set(key, value);
        self
    }
}

/// What happened in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    Added,
    Updated,
    Removed,
    /// Several changes delivered as one
    Batch,
    /// Wholesale replacement of the store contents
    Reset,
}

/// A change notification. `ids` lists the affected entities where known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub ids: Vec<EntityId>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, ids: Vec<EntityId>) -> Self {
        Self { kind, ids }
    }

    pub fn single(kind: ChangeKind, id: EntityId) -> Self {
        Self::new(kind, vec![id])
    }
}

/// Unique identifier for a store subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Callback invoked for each change notification. Errors and panics are
/// contained by the store and never reach other subscribers.
pub type ChangeHandler = Arc<dyn Fn(&ChangeEvent) -> anyhow::Result<()> + Send + Sync>;

/// An external, possibly shared, entity store.
///
/// Mutations are fire-and-forget. Each one eventually produces a change
/// notification, possibly on another thread and possibly folded into a
/// batch.
pub trait EntityStore: Send + Sync {
    /// Every entity, in the store's stable order
    fn get_all(&self) -> Vec<Entity>;

    fn get(&self, id: EntityId) -> Option<Entity> {
        self.get_all().into_iter().find(|e| e.id == id)
    }

    fn add_entity(&self, entity: Entity);

    fn update_entity(&self, entity: Entity);

    fn remove_entity(&self, id: EntityId);

    fn subscribe(&self, handler: ChangeHandler) -> SubscriptionId;

    /// Returns false if the subscription was unknown
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Start collecting notifications into one batch event
    fn begin_batch(&self) {}

    /// Deliver the collected batch, if any
    fn end_batch(&self) {}
}
