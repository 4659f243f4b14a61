//! Shape kinds and immutable shape records.
//!
//! ShapeKind doubles as the tool selector. ShapeRecord is a value: every
//! edit produces a new record, never mutates one in place.

use diagrammer_geometry::{Anchors, ArrowStyle, Geometry, Handle, Point, Rect, pick_tolerance, rounded_arc};
use serde::{Deserialize, Serialize};

use crate::store::EntityId;
use crate::style::{Color, FontSpec};

/// Different kinds of shapes we can draw, plus the non-drawing tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeKind {
    #[default]
    Select,
    Freehand,
    Line,
    Oval,
    Rectangle,
    RoundedRectangle,
    ArrowFilled,
    ArrowDiamond,
    ArrowOpen,
    Text,
    Delete,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 11] = [
        ShapeKind::Select,
        ShapeKind::Freehand,
        ShapeKind::Line,
        ShapeKind::Oval,
        ShapeKind::Rectangle,
        ShapeKind::RoundedRectangle,
        ShapeKind::ArrowFilled,
        ShapeKind::ArrowDiamond,
        ShapeKind::ArrowOpen,
        ShapeKind::Text,
        ShapeKind::Delete,
    ];

    /// Stable name used in stored entities
    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::Select => "Select",
            ShapeKind::Freehand => "Freehand",
            ShapeKind::Line => "Line",
            ShapeKind::Oval => "Oval",
            ShapeKind::Rectangle => "Rectangle",
            ShapeKind::RoundedRectangle => "RoundedRectangle",
            ShapeKind::ArrowFilled => "ArrowFilled",
            ShapeKind::ArrowDiamond => "ArrowDiamond",
            ShapeKind::ArrowOpen => "ArrowOpen",
            ShapeKind::Text => "Text",
            ShapeKind::Delete => "Delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name().eq_ignore_ascii_case(name))
    }

    /// Tools that never produce a committed record
    pub fn is_tool_only(self) -> bool {
        matches!(self, ShapeKind::Select | ShapeKind::Delete)
    }

    pub fn arrow_style(self) -> Option<ArrowStyle> {
        match self {
            ShapeKind::ArrowFilled => Some(ArrowStyle::Filled),
            ShapeKind::ArrowDiamond => Some(ArrowStyle::Diamond),
            ShapeKind::ArrowOpen => Some(ArrowStyle::Open),
            _ => None,
        }
    }

    /// Build the outline for this kind from two anchor points.
    ///
    /// Segment kinds keep the raw direction; box kinds normalize.
    pub fn geometry(self, anchors: &Anchors) -> Geometry {
        let rect = anchors.rect();
        match self {
            ShapeKind::Oval => Geometry::Ellipse { rect },
            ShapeKind::Rectangle | ShapeKind::Text => Geometry::Rect { rect },
            ShapeKind::RoundedRectangle => Geometry::RoundedRect {
                rect,
                arc: rounded_arc(rect.width, rect.height),
            },
            ShapeKind::Freehand => {
                let (start, end) = (anchors.start(), anchors.end());
                let points = if start == end { vec![start] } else { vec![start, end] };
                Geometry::Polyline { points }
            }
            ShapeKind::Select
            | ShapeKind::Line
            | ShapeKind::ArrowFilled
            | ShapeKind::ArrowDiamond
            | ShapeKind::ArrowOpen
            | ShapeKind::Delete => Geometry::Segment {
                start: anchors.start(),
                end: anchors.end(),
            },
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One committed (or previewed) shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRecord {
    pub kind: ShapeKind,
    pub geometry: Geometry,
    pub color: Color,
    pub stroke_width: f32,
    pub anchors: Anchors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontSpec>,
    /// Id of the mirrored store entity, when the record came from a store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<EntityId>,
}

impl ShapeRecord {
    /// A record of `kind` drawn between the two anchors
    pub fn build(kind: ShapeKind, anchors: Anchors, color: Color, stroke_width: f32) -> Self {
        Self {
            kind,
            geometry: kind.geometry(&anchors),
            color,
            stroke_width,
            anchors,
            text: None,
            font: None,
            external_id: None,
        }
    }

    /// A freehand path through `points`. Anchors are the first and last point.
    pub fn freehand(points: Vec<Point>, color: Color, stroke_width: f32) -> Self {
        let start = points.first().copied().unwrap_or_default();
        let end = points.last().copied().unwrap_or(start);
        Self {
            kind: ShapeKind::Freehand,
            geometry: Geometry::Polyline { points },
            color,
            stroke_width,
            anchors: Anchors::from_points(start, end),
            text: None,
            font: None,
            external_id: None,
        }
    }

    /// A text box filling `rect`
    pub fn text(text: impl Into<String>, font: FontSpec, rect: Rect, color: Color, stroke_width: f32) -> Self {
        Self {
            kind: ShapeKind::Text,
            geometry: Geometry::Rect { rect },
            color,
            stroke_width,
            anchors: Anchors::from_points(rect.top_left(), rect.bottom_right()),
            text: Some(text.into()),
            font: Some(font),
            external_id: None,
        }
    }

    pub fn with_external_id(mut self, id: EntityId) -> Self {
        self.external_id = Some(id);
        self
    }

    pub fn bounds(&self) -> Rect {
        self.geometry.bounds()
    }

    /// Hit test with the stroke-widened pick tolerance
    pub fn contains(&self, p: Point) -> bool {
        self.geometry.hit(p, pick_tolerance(self.stroke_width))
    }

    pub fn points(&self) -> Option<&[Point]> {
        match &self.geometry {
            Geometry::Polyline { points } => Some(points),
            _ => None,
        }
    }

    /// Freehand preview with one more point appended
    pub fn extended(&self, p: Point) -> Self {
        let mut next = self.clone();
        if let Geometry::Polyline { points } = &mut next.geometry {
            points.push(p);
            next.anchors = Anchors::from_points(next.anchors.start(), p);
        }
        next
    }

    /// Move geometry and anchors together, keeping text, font and id
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            geometry: self.geometry.translated(dx, dy),
            anchors: self.anchors.translated(dx, dy),
            ..self.clone()
        }
    }

    /// Drag `handle` of this record's bounding box to `to`.
    ///
    /// Text boxes keep text and font. Freehand paths are rescaled into the
    /// new box. Everything else is rebuilt from the new anchors.
    pub fn resized(&self, handle: Handle, to: Point) -> Self {
        let bounds = self.bounds();
        let anchors = handle.resize_anchors(&self.anchors, bounds, to);
        let target = anchors.rect();

        let geometry = match (&self.geometry, self.kind) {
            (_, ShapeKind::Text) => Geometry::Rect { rect: target },
            (Geometry::Polyline { points }, _) => Geometry::Polyline {
                points: rescale(points, bounds, target),
            },
            _ => self.kind.geometry(&anchors),
        };

        Self {
            geometry,
            anchors,
            ..self.clone()
        }
    }

    /// Replace text content, font and color of a text record
    pub fn with_text(&self, text: impl Into<String>, font: Option<FontSpec>, color: Color) -> Self {
        Self {
            text: Some(text.into()),
            font,
            color,
            ..self.clone()
        }
    }
}

fn rescale(points: &[Point], from: Rect, to: Rect) -> Vec<Point> {
    let axis = |v: f64, from_min: f64, from_len: f64, to_min: f64, to_len: f64| {
        if from_len == 0.0 {
            to_min + to_len / 2.0
        } else {
            to_min + (v - from_min) / from_len * to_len
        }
    };
    points
        .iter()
        .map(|p| {
            Point::new(
                axis(p.x, from.x, from.width, to.x, to.width),
                axis(p.y, from.y, from.height, to.y, to.height),
            )
        })
        .collect()
}
