//! Arrow head construction.
//!
//! The head is sized from the stroke width. The shaft of an arrow is drawn
//! from its start to [`arrow_head_base`], then the head fills the rest.

use serde::{Deserialize, Serialize};

use crate::primitives::Point;

/// Below this length a segment has no direction
pub const DEGENERATE_LENGTH: f64 = 1e-6;

/// Head decoration at the end point of an arrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowStyle {
    Filled,
    Diamond,
    Open,
}

/// Resolved head geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrowHead {
    /// Triangle: tip, left, right
    Filled([Point; 3]),
    /// Quadrilateral: tip, left, center, right
    Diamond([Point; 4]),
    /// Two strokes from the tip
    Open { tip: Point, left: Point, right: Point },
}

impl ArrowHead {
    /// Polygon to fill, if the head is a filled shape
    pub fn polygon(&self) -> Option<&[Point]> {
        match self {
            ArrowHead::Filled(points) => Some(points.as_slice()),
            ArrowHead::Diamond(points) => Some(points.as_slice()),
            ArrowHead::Open { .. } => None,
        }
    }

    /// Strokes to draw, if the head is an open chevron
    pub fn strokes(&self) -> Option<[(Point, Point); 2]> {
        match *self {
            ArrowHead::Open { tip, left, right } => Some([(tip, left), (tip, right)]),
            _ => None,
        }
    }
}

/// `max(8, 6 + 2 * stroke)`
pub fn head_length(stroke_width: f32) -> f64 {
    8.0_f64.max(6.0 + 2.0 * f64::from(stroke_width))
}

/// `max(6, 4 + 1.5 * stroke)`
pub fn head_width(stroke_width: f32) -> f64 {
    6.0_f64.max(4.0 + 1.5 * f64::from(stroke_width))
}

fn unit(start: Point, end: Point) -> Option<(f64, f64)> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len = dx.hypot(dy);
    if len < DEGENERATE_LENGTH {
        return None;
    }
    Some((dx / len, dy / len))
}

/// Where the shaft stops: `end - u * head_length`. A degenerate segment
/// returns `end`, so the shaft has zero length.
pub fn arrow_head_base(start: Point, end: Point, stroke_width: f32) -> Point {
    match unit(start, end) {
        Some((ux, uy)) => {
            let len = head_length(stroke_width);
            Point::new(end.x - ux * len, end.y - uy * len)
        }
        None => end,
    }
}

/// Head geometry for an arrow from `start` to `end`, or `None` when the
/// segment is too short to have a direction.
pub fn arrow_head(start: Point, end: Point, stroke_width: f32, style: ArrowStyle) -> Option<ArrowHead> {
    let (ux, uy) = unit(start, end)?;
    let (px, py) = (-uy, ux);
    let len = head_length(stroke_width);
    let half = head_width(stroke_width) / 2.0;

    let base = Point::new(end.x - ux * len, end.y - uy * len);
    let left = Point::new(base.x + px * half, base.y + py * half);
    let right = Point::new(base.x - px * half, base.y - py * half);

    Some(match style {
        ArrowStyle::Filled => ArrowHead::Filled([end, left, right]),
        ArrowStyle::Diamond => {
            let center = Point::new(base.x - ux * len / 2.0, base.y - uy * len / 2.0);
            ArrowHead::Diamond([end, left, center, right])
        }
        ArrowStyle::Open => ArrowHead::Open { tip: end, left, right },
    })
}
