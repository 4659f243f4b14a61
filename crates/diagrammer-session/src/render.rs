//! Drawing records onto a [`Surface`].
//!
//! A surface strokes outlines, fills polygons and places lines of text.
//! Arrow heads, text wrapping and selection handles are resolved here.

use diagrammer_core::{Color, FontSpec, ShapeKind, ShapeRecord};
use diagrammer_geometry::{Geometry, Point, Rect, arrow_head, arrow_head_base, handle_rects};

use crate::editor::Editor;

/// Opacity applied to the in-progress preview
pub const PREVIEW_OPACITY: f64 = 0.85;

/// Padding between a text box edge and its text
pub const TEXT_INSET: f64 = 4.0;

/// Stroke width of the selection outline and handle borders
const SELECTION_STROKE: f32 = 1.0;

/// A drawing backend
pub trait Surface {
    fn draw_outline(&mut self, geometry: &Geometry, color: Color, width: f32);

    fn fill_polygon(&mut self, polygon: &[Point], color: Color);

    /// Draw one line of text with its baseline starting at `origin`
    fn draw_text_line(&mut self, line: &str, origin: Point, font: &FontSpec, color: Color);

    /// Word-wrapped text inside `bounds`
    fn draw_wrapped_text(&mut self, text: &str, font: &FontSpec, bounds: Rect, color: Color) {
        for line in layout_text(text, font, bounds) {
            self.draw_text_line(&line.text, line.origin, font, color);
        }
    }

    /// Opacity for everything drawn until the next call
    fn set_opacity(&mut self, _opacity: f64) {}
}

/// One laid-out line of a text record
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    /// Baseline start
    pub origin: Point,
}

/// Word-wrap `text` into `bounds`.
///
/// Lines break at newlines and wherever the next word would exceed the
/// inset width. A word wider than the box gets a line of its own. Layout
/// stops once the baseline passes the bottom of the box.
pub fn layout_text(text: &str, font: &FontSpec, bounds: Rect) -> Vec<TextLine> {
    let mut layout = Layout {
        lines: Vec::new(),
        x: bounds.x + TEXT_INSET,
        y: bounds.y + TEXT_INSET + font.ascent(),
        bottom: bounds.max_y(),
        line_height: font.line_height(),
    };
    let wrap_width = (bounds.width - 2.0 * TEXT_INSET).max(TEXT_INSET);

    for paragraph in text.lines() {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            if !layout.advance() {
                break;
            }
            continue;
        }

        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if font.advance(&candidate) > wrap_width && !line.is_empty() {
                if !layout.emit(std::mem::replace(&mut line, word.to_string())) {
                    return layout.lines;
                }
            } else {
                line = candidate;
            }
        }
        if !line.is_empty() && !layout.emit(line) {
            break;
        }
    }
    layout.lines
}

struct Layout {
    lines: Vec<TextLine>,
    x: f64,
    y: f64,
    bottom: f64,
    line_height: f64,
}

impl Layout {
    /// Place a line at the current baseline; false once the box is full
    fn emit(&mut self, text: String) -> bool {
        self.lines.push(TextLine {
            text,
            origin: Point::new(self.x, self.y),
        });
        self.advance()
    }

    fn advance(&mut self) -> bool {
        self.y += self.line_height;
        self.y <= self.bottom
    }
}

/// Draw one record
pub fn draw_record(surface: &mut dyn Surface, record: &ShapeRecord) {
    let stroke = record.stroke_width;

    if let Some(style) = record.kind.arrow_style() {
        let (start, end) = (record.anchors.start(), record.anchors.end());
        let base = arrow_head_base(start, end, stroke);
        surface.draw_outline(&Geometry::Segment { start, end: base }, record.color, stroke);

        let Some(head) = arrow_head(start, end, stroke, style) else {
            return;
        };
        if let Some(polygon) = head.polygon() {
            surface.fill_polygon(polygon, record.color);
        }
        if let Some(strokes) = head.strokes() {
            for (start, end) in strokes {
                surface.draw_outline(&Geometry::Segment { start, end }, record.color, stroke);
            }
        }
        return;
    }

    if record.kind == ShapeKind::Text {
        let Some(text) = record.text.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };
        let bounds = record.bounds();
        let font = record
            .font
            .clone()
            .unwrap_or_else(|| FontSpec::for_box_height(bounds.height));
        surface.draw_wrapped_text(text, &font, bounds, record.color);
        return;
    }

    surface.draw_outline(&record.geometry, record.color, stroke);
}

/// Selection outline plus the four corner handles
pub fn draw_selection(surface: &mut dyn Surface, bounds: Rect) {
    surface.draw_outline(&Geometry::Rect { rect: bounds }, Color::BLUE, SELECTION_STROKE);
    for (_, handle) in handle_rects(bounds) {
        surface.fill_polygon(&handle.corners(), Color::WHITE);
        surface.draw_outline(&Geometry::Rect { rect: handle }, Color::BLUE, SELECTION_STROKE);
    }
}

/// Draw a whole editor frame: records in order, then the preview, then the
/// selection decoration
pub fn render(surface: &mut dyn Surface, editor: &Editor) {
    for record in editor.shapes() {
        draw_record(surface, record);
    }

    if let Some(preview) = editor.preview() {
        surface.set_opacity(PREVIEW_OPACITY);
        draw_record(surface, preview);
        surface.set_opacity(1.0);
    }

    if let Some(selected) = editor.selected_record() {
        draw_selection(surface, selected.bounds());
    }
}
