//! Geometry kernel for diagrammer.
//!
//! Points and rectangles in canvas units, the outline geometry that shape
//! records carry, hit testing with stroke tolerance, selection handles,
//! and arrow head construction.

pub mod arrow;
pub mod handles;
pub mod outline;
pub mod primitives;

pub use arrow::{ArrowHead, ArrowStyle, arrow_head, arrow_head_base, head_length, head_width};
pub use handles::{HANDLE_SIZE, Handle, handle_hit, handle_rects};
pub use outline::{Geometry, distance_to_segment, pick_tolerance, rounded_arc};
pub use primitives::{Anchors, Point, Rect};
