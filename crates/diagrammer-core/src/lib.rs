//! Core types for diagrammer: shape records, styles, entity stores, the
//! record/entity projection, and the shape document.

pub mod document;
pub mod projection;
pub mod shapes;
pub mod store;
pub mod style;

pub use document::{Appended, Document, LocalDocument, StoreBackedDocument, hit_test};
pub use projection::{entity_from_shape, shape_from_entity};
pub use shapes::{ShapeKind, ShapeRecord};
pub use store::{
    AttrValue, AutomergeStore, ChangeEvent, ChangeHandler, ChangeKind, Delivery, Entity, EntityId, EntityStore,
    MemoryStore, SubscriptionId,
};
pub use style::{Color, FontSpec, FontStyle};
