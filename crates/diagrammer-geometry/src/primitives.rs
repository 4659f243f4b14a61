//! Basic value types: points, rectangles, and the anchor pair a shape was drawn from.

use serde::{Deserialize, Serialize};

/// A position on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned rectangle. Width and height are non-negative when built
/// through [`Rect::from_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Normalized rectangle spanning two arbitrary corners
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Smallest rectangle covering every point. Empty input yields a zero
    /// rectangle at the origin.
    pub fn enclosing(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.max_x(), self.max_y())
    }

    /// Corners clockwise from the top-left
    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.x, self.y),
            Point::new(self.max_x(), self.y),
            Point::new(self.max_x(), self.max_y()),
            Point::new(self.x, self.max_y()),
        ]
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.max_x() && p.y >= self.y && p.y <= self.max_y()
    }

    /// Grow outward by `amount` on every side
    pub fn inflate(&self, amount: f64) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + 2.0 * amount,
            self.height + 2.0 * amount,
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// The two defining points a shape was drawn from: press position and
/// current/last drag position. Not normalized, so `x1 > x2` is legal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Anchors {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Anchors {
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn from_points(start: Point, end: Point) -> Self {
        Self::new(start.x, start.y, end.x, end.y)
    }

    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }

    /// Normalized rectangle spanned by the anchors
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.start(), self.end())
    }

    /// Re-express a corner pair in this pair's orientation.
    ///
    /// `min` and `max` are the new top-left and bottom-right. The result
    /// keeps `x1` on the same side of `x2` (and `y1` of `y2`) as `self`.
    pub fn reoriented(&self, min: Point, max: Point) -> Self {
        let (x1, x2) = if self.x1 <= self.x2 { (min.x, max.x) } else { (max.x, min.x) };
        let (y1, y2) = if self.y1 <= self.y2 { (min.y, max.y) } else { (max.y, min.y) };
        Self::new(x1, y1, x2, y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes() {
        let r = Rect::from_corners(Point::new(50.0, 40.0), Point::new(10.0, 20.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 40.0, 20.0));
    }

    #[test]
    fn test_enclosing_empty_is_origin() {
        assert_eq!(Rect::enclosing(&[]), Rect::default());
    }

    #[test]
    fn test_enclosing_points() {
        let r = Rect::enclosing(&[Point::new(3.0, 9.0), Point::new(-1.0, 4.0), Point::new(7.0, 5.0)]);
        assert_eq!(r, Rect::new(-1.0, 4.0, 8.0, 5.0));
    }

    #[test]
    fn test_reoriented_keeps_direction() {
        let anchors = Anchors::new(100.0, 10.0, 20.0, 80.0);
        let moved = anchors.reoriented(Point::new(0.0, 0.0), Point::new(50.0, 60.0));
        assert_eq!(moved, Anchors::new(50.0, 0.0, 0.0, 60.0));
    }

    #[test]
    fn test_contains_is_inclusive() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(!r.contains(Point::new(10.1, 5.0)));
    }
}
