//! Corner handles around a selected shape's bounding box.

use serde::{Deserialize, Serialize};

use crate::primitives::{Anchors, Point, Rect};

/// Side length of a selection handle square
pub const HANDLE_SIZE: f64 = 8.0;

/// Handle for resizing shapes, one per bounding-box corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handle {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Handle {
    /// Hit-test order, clockwise from top-left
    pub const ALL: [Handle; 4] = [Handle::TopLeft, Handle::TopRight, Handle::BottomRight, Handle::BottomLeft];

    /// The corner of `bounds` this handle sits on
    pub fn corner(self, bounds: Rect) -> Point {
        match self {
            Handle::TopLeft => Point::new(bounds.x, bounds.y),
            Handle::TopRight => Point::new(bounds.max_x(), bounds.y),
            Handle::BottomRight => Point::new(bounds.max_x(), bounds.max_y()),
            Handle::BottomLeft => Point::new(bounds.x, bounds.max_y()),
        }
    }

    /// Move this handle's corner of `bounds` to `to`, keeping the opposite
    /// corner fixed. Returns the new (min, max) corner pair, normalized.
    pub fn drag_corner(self, bounds: Rect, to: Point) -> (Point, Point) {
        let (mut x1, mut y1, mut x2, mut y2) = (bounds.x, bounds.y, bounds.max_x(), bounds.max_y());
        match self {
            Handle::TopLeft => {
                x1 = to.x;
                y1 = to.y;
            }
            Handle::TopRight => {
                x2 = to.x;
                y1 = to.y;
            }
            Handle::BottomRight => {
                x2 = to.x;
                y2 = to.y;
            }
            Handle::BottomLeft => {
                x1 = to.x;
                y2 = to.y;
            }
        }
        let r = Rect::from_corners(Point::new(x1, y1), Point::new(x2, y2));
        (r.top_left(), r.bottom_right())
    }

    /// Resize an anchor pair whose shape has `bounds`, preserving which
    /// anchor lies left/above the other.
    pub fn resize_anchors(self, anchors: &Anchors, bounds: Rect, to: Point) -> Anchors {
        let (min, max) = self.drag_corner(bounds, to);
        anchors.reoriented(min, max)
    }
}

/// The four handle squares, centered on the corners of `bounds`
pub fn handle_rects(bounds: Rect) -> [(Handle, Rect); 4] {
    let half = HANDLE_SIZE / 2.0;
    Handle::ALL.map(|handle| {
        let c = handle.corner(bounds);
        (handle, Rect::new(c.x - half, c.y - half, HANDLE_SIZE, HANDLE_SIZE))
    })
}

/// First handle (in [`Handle::ALL`] order) whose square contains `p`
pub fn handle_hit(bounds: Rect, p: Point) -> Option<Handle> {
    handle_rects(bounds)
        .into_iter()
        .find(|(_, rect)| rect.contains(p))
        .map(|(handle, _)| handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_handle_hit_corners() {
        let b = Rect::new(10.0, 10.0, 100.0, 50.0);
        assert_eq!(handle_hit(b, Point::new(12.0, 9.0)), Some(Handle::TopLeft));
        assert_eq!(handle_hit(b, Point::new(110.0, 10.0)), Some(Handle::TopRight));
        assert_eq!(handle_hit(b, Point::new(113.0, 63.0)), Some(Handle::BottomRight));
        assert_eq!(handle_hit(b, Point::new(7.0, 60.0)), Some(Handle::BottomLeft));
        assert_eq!(handle_hit(b, Point::new(60.0, 35.0)), None);
    }

    #[test]
    fn test_tiny_bounds_prefers_top_left() {
        let b = Rect::new(0.0, 0.0, 2.0, 2.0);
        assert_eq!(handle_hit(b, Point::new(1.0, 1.0)), Some(Handle::TopLeft));
    }

    #[test]
    fn test_drag_corner_keeps_opposite() {
        let b = Rect::new(10.0, 10.0, 100.0, 50.0);
        let (min, max) = Handle::BottomRight.drag_corner(b, Point::new(50.0, 30.0));
        assert_eq!(min, Point::new(10.0, 10.0));
        assert_eq!(max, Point::new(50.0, 30.0));
    }

    #[test]
    fn test_drag_corner_past_opposite_normalizes() {
        let b = Rect::new(10.0, 10.0, 100.0, 50.0);
        let (min, max) = Handle::BottomRight.drag_corner(b, Point::new(0.0, 0.0));
        assert_eq!(min, Point::new(0.0, 0.0));
        assert_eq!(max, Point::new(10.0, 10.0));
    }

    #[test]
    fn test_resize_anchors_of_reversed_line() {
        // line drawn right-to-left, bottom-to-top
        let anchors = Anchors::new(110.0, 60.0, 10.0, 10.0);
        let bounds = anchors.rect();
        let resized = Handle::TopLeft.resize_anchors(&anchors, bounds, Point::new(0.0, 0.0));
        assert_eq!(resized, Anchors::new(110.0, 60.0, 0.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_resize_never_negative(
            x in -500.0f64..500.0, y in -500.0f64..500.0,
            w in 0.0f64..500.0, h in 0.0f64..500.0,
            px in -1000.0f64..1000.0, py in -1000.0f64..1000.0,
            which in 0usize..4,
        ) {
            let (min, max) = Handle::ALL[which].drag_corner(Rect::new(x, y, w, h), Point::new(px, py));
            prop_assert!(max.x >= min.x);
            prop_assert!(max.y >= min.y);
        }
    }
}
