//! Conversion between shape records and store entities.
//!
//! Entities are typed `"text"` or `"shape"`. Coordinates are stored as
//! floats under `x1`..`y2`; shapes add `kind`, `colorRGB`, `strokeWidth`
//! and, for freehand paths, a flat `points` list. Missing attributes fall
//! back to defaults so foreign or partial entities still display.

use diagrammer_geometry::{Anchors, Point, Rect};

use crate::shapes::{ShapeKind, ShapeRecord};
use crate::store::{AttrValue, Entity, EntityId};
use crate::style::{Color, FontSpec, FontStyle};

pub const TEXT_TYPE: &str = "text";
pub const SHAPE_TYPE: &str = "shape";

pub mod keys {
    pub const X1: &str = "x1";
    pub const Y1: &str = "y1";
    pub const X2: &str = "x2";
    pub const Y2: &str = "y2";
    pub const KIND: &str = "kind";
    pub const COLOR: &str = "colorRGB";
    pub const STROKE: &str = "strokeWidth";
    pub const POINTS: &str = "points";
    pub const TEXT: &str = "text";
    pub const FONT_NAME: &str = "fontName";
    pub const FONT_STYLE: &str = "fontStyle";
    pub const FONT_SIZE: &str = "fontSize";
}

/// Smallest width/height of a text box read from an entity
const MIN_TEXT_EXTENT: f64 = 4.0;

/// Project a record into an entity. Records without an external id get a
/// fresh one.
pub fn entity_from_shape(record: &ShapeRecord) -> Entity {
    let id = record.external_id.unwrap_or_else(EntityId::new);
    let entity_type = if record.kind == ShapeKind::Text { TEXT_TYPE } else { SHAPE_TYPE };
    let a = record.anchors;

    let mut entity = Entity::new(id, entity_type)
        .with(keys::X1, a.x1)
        .with(keys::Y1, a.y1)
        .with(keys::X2, a.x2)
        .with(keys::Y2, a.y2)
        .with(keys::COLOR, i64::from(record.color.0))
        .with(keys::STROKE, f64::from(record.stroke_width));

    if record.kind == ShapeKind::Text {
        if let Some(text) = &record.text {
            entity.set(keys::TEXT, text.as_str());
        }
        if let Some(font) = &record.font {
            entity.set(keys::FONT_NAME, font.name.as_str());
            entity.set(keys::FONT_STYLE, font.style.code());
            entity.set(keys::FONT_SIZE, i64::from(font.size));
        }
    } else {
        entity.set(keys::KIND, record.kind.name());
        if let Some(points) = record.points().filter(|_| record.kind == ShapeKind::Freehand) {
            let flat = points
                .iter()
                .flat_map(|p| [AttrValue::Float(p.x), AttrValue::Float(p.y)])
                .collect();
            entity.set(keys::POINTS, AttrValue::List(flat));
        }
    }
    entity
}

/// Rebuild a record from an entity. Always succeeds; absent or malformed
/// attributes take defaults. The record carries the entity's id.
pub fn shape_from_entity(entity: &Entity, default_stroke: f32) -> ShapeRecord {
    let number = |key: &str| entity.get(key).and_then(AttrValue::as_f64);
    let color = entity
        .get(keys::COLOR)
        .and_then(AttrValue::as_i64)
        .map(Color::from_stored)
        .unwrap_or(Color::BLACK);
    let stroke = number(keys::STROKE).map(|s| s as f32).unwrap_or(default_stroke);

    let record = if entity.entity_type.eq_ignore_ascii_case(TEXT_TYPE) {
        let x1 = number(keys::X1).unwrap_or(0.0);
        let y1 = number(keys::Y1).unwrap_or(0.0);
        let x2 = number(keys::X2).unwrap_or(x1 + 80.0);
        let y2 = number(keys::Y2).unwrap_or(y1 + 30.0);
        let text = entity.get(keys::TEXT).and_then(AttrValue::as_str).unwrap_or_default();

        let default_font = FontSpec::for_box_height(y2 - y1);
        let font = FontSpec::new(
            entity
                .get(keys::FONT_NAME)
                .and_then(AttrValue::as_str)
                .unwrap_or(FontSpec::DEFAULT_FAMILY),
            entity
                .get(keys::FONT_STYLE)
                .and_then(AttrValue::as_i64)
                .map(FontStyle::from_code)
                .unwrap_or_default(),
            entity
                .get(keys::FONT_SIZE)
                .and_then(AttrValue::as_i64)
                .and_then(|s| u32::try_from(s).ok())
                .unwrap_or(default_font.size),
        );

        let rect = Rect::new(x1, y1, (x2 - x1).max(MIN_TEXT_EXTENT), (y2 - y1).max(MIN_TEXT_EXTENT));
        ShapeRecord::text(text, font, rect, color, stroke)
    } else {
        let x1 = number(keys::X1).unwrap_or(10.0);
        let y1 = number(keys::Y1).unwrap_or(10.0);
        let x2 = number(keys::X2).unwrap_or(x1 + 80.0);
        let y2 = number(keys::Y2).unwrap_or(y1 + 40.0);
        let anchors = Anchors::new(x1, y1, x2, y2);

        let kind = entity
            .get(keys::KIND)
            .and_then(AttrValue::as_str)
            .and_then(ShapeKind::from_name)
            .filter(|k| !k.is_tool_only() && *k != ShapeKind::Text)
            .unwrap_or(ShapeKind::Rectangle);

        match (kind, entity.get(keys::POINTS).and_then(AttrValue::as_list)) {
            (ShapeKind::Freehand, Some(flat)) if flat.len() >= 2 => {
                let points = flat
                    .chunks_exact(2)
                    .filter_map(|pair| Some(Point::new(pair[0].as_f64()?, pair[1].as_f64()?)))
                    .collect();
                ShapeRecord {
                    anchors,
                    ..ShapeRecord::freehand(points, color, stroke)
                }
            }
            _ => ShapeRecord::build(kind, anchors, color, stroke),
        }
    };

    record.with_external_id(entity.id)
}
