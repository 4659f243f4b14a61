//! Outline geometry and hit testing.

use serde::{Deserialize, Serialize};

use crate::primitives::{Point, Rect};

/// Minimum distance from an outline that still counts as a hit
pub const MIN_PICK_TOLERANCE: f64 = 6.0;

/// Smallest corner arc of a rounded rectangle
pub const MIN_ROUNDED_ARC: f64 = 8.0;

/// The drawable outline of a shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    /// Open path through the points in order
    Polyline { points: Vec<Point> },
    Segment { start: Point, end: Point },
    Ellipse { rect: Rect },
    Rect { rect: Rect },
    /// `arc` is the corner arc diameter
    RoundedRect { rect: Rect, arc: f64 },
}

impl Geometry {
    pub fn bounds(&self) -> Rect {
        match self {
            Geometry::Polyline { points } => Rect::enclosing(points),
            Geometry::Segment { start, end } => Rect::from_corners(*start, *end),
            Geometry::Ellipse { rect } | Geometry::Rect { rect } | Geometry::RoundedRect { rect, .. } => *rect,
        }
    }

    /// Whether the shape encloses an interior
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Geometry::Ellipse { .. } | Geometry::Rect { .. } | Geometry::RoundedRect { .. }
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        match self {
            Geometry::Polyline { points } => Geometry::Polyline {
                points: points.iter().map(|p| p.translated(dx, dy)).collect(),
            },
            Geometry::Segment { start, end } => Geometry::Segment {
                start: start.translated(dx, dy),
                end: end.translated(dx, dy),
            },
            Geometry::Ellipse { rect } => Geometry::Ellipse {
                rect: rect.translated(dx, dy),
            },
            Geometry::Rect { rect } => Geometry::Rect {
                rect: rect.translated(dx, dy),
            },
            Geometry::RoundedRect { rect, arc } => Geometry::RoundedRect {
                rect: rect.translated(dx, dy),
                arc: *arc,
            },
        }
    }

    /// True when `p` lies within `tolerance` of the outline, or inside a
    /// closed shape's interior.
    pub fn hit(&self, p: Point, tolerance: f64) -> bool {
        match self {
            Geometry::Polyline { points } => match points.as_slice() {
                [] => false,
                [only] => only.distance(p) <= tolerance,
                _ => points
                    .windows(2)
                    .any(|w| distance_to_segment(p, w[0], w[1]) <= tolerance),
            },
            Geometry::Segment { start, end } => distance_to_segment(p, *start, *end) <= tolerance,
            Geometry::Rect { rect } => rect.inflate(tolerance).contains(p),
            Geometry::Ellipse { rect } => {
                let c = rect.center();
                let rx = rect.width / 2.0 + tolerance;
                let ry = rect.height / 2.0 + tolerance;
                let nx = (p.x - c.x) / rx;
                let ny = (p.y - c.y) / ry;
                nx * nx + ny * ny <= 1.0
            }
            Geometry::RoundedRect { rect, arc } => {
                rounded_rect_contains(rect.inflate(tolerance), arc + 2.0 * tolerance, p)
            }
        }
    }
}

/// Hit tolerance for a stroke width: `max(6, stroke + 6)`
pub fn pick_tolerance(stroke_width: f32) -> f64 {
    MIN_PICK_TOLERANCE.max(f64::from(stroke_width) + MIN_PICK_TOLERANCE)
}

/// Corner arc for a rounded rectangle of the given size: `max(8, min(w, h) / 4)`
pub fn rounded_arc(width: f64, height: f64) -> f64 {
    MIN_ROUNDED_ARC.max(width.min(height) / 4.0)
}

/// Euclidean distance from `p` to the closed segment `a..b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn rounded_rect_contains(rect: Rect, arc: f64, p: Point) -> bool {
    if !rect.contains(p) {
        return false;
    }
    let rx = (arc / 2.0).min(rect.width / 2.0);
    let ry = (arc / 2.0).min(rect.height / 2.0);
    if rx <= 0.0 || ry <= 0.0 {
        return true;
    }

    // Only the four corner quadrants can reject a point inside the rect.
    let cx = if p.x < rect.x + rx {
        rect.x + rx
    } else if p.x > rect.max_x() - rx {
        rect.max_x() - rx
    } else {
        return true;
    };
    let cy = if p.y < rect.y + ry {
        rect.y + ry
    } else if p.y > rect.max_y() - ry {
        rect.max_y() - ry
    } else {
        return true;
    };

    let nx = (p.x - cx) / rx;
    let ny = (p.y - cy) / ry;
    nx * nx + ny * ny <= 1.0
}
