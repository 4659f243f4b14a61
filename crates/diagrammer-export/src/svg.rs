//! SVG export for diagrammer
//!
//! [`SvgSurface`] turns the drawing calls made by
//! [`diagrammer_session::render`] into SVG elements, so an export shows
//! exactly what the editor draws: arrow heads, wrapped text, the preview
//! and the selection handles.

use std::fmt::Write;
use std::path::Path;

use anyhow::{Context, Result};
use diagrammer_core::{Color, FontSpec};
use diagrammer_geometry::{Geometry, Point};
use diagrammer_session::{Editor, Surface, draw_record, render};

/// A [`Surface`] that collects SVG elements
#[derive(Debug)]
pub struct SvgSurface {
    body: String,
    opacity: f64,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self {
            body: String::new(),
            opacity: 1.0,
        }
    }

    /// Wrap the collected elements in an `<svg>` document
    pub fn finish(self, width: f64, height: f64) -> String {
        let mut output = String::new();

        // SVG header
        let _ = writeln!(
            output,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg"
     width="{width}" height="{height}"
     viewBox="0 0 {width} {height}"
     style="background-color: white;">"#
        );
        output.push_str(&self.body);
        let _ = writeln!(output, "</svg>");

        output
    }

    /// Extra attributes for the current opacity and the color's alpha
    fn paint_opacity(&self, color: Color) -> String {
        let opacity = self.opacity * color.opacity();
        if opacity < 1.0 {
            format!(r#" opacity="{}""#, fmt_num(opacity))
        } else {
            String::new()
        }
    }
}

impl Surface for SvgSurface {
    fn draw_outline(&mut self, geometry: &Geometry, color: Color, width: f32) {
        let stroke = format!(
            r#"fill="none" stroke="{}" stroke-width="{}"{}"#,
            color.to_css(),
            fmt_num(f64::from(width)),
            self.paint_opacity(color)
        );

        let _ = match geometry {
            Geometry::Polyline { points } => writeln!(
                self.body,
                r#"  <polyline points="{}" {stroke} stroke-linecap="round" stroke-linejoin="round"/>"#,
                points_attr(points)
            ),
            Geometry::Segment { start, end } => writeln!(
                self.body,
                r#"  <line x1="{}" y1="{}" x2="{}" y2="{}" {stroke} stroke-linecap="round"/>"#,
                fmt_num(start.x),
                fmt_num(start.y),
                fmt_num(end.x),
                fmt_num(end.y)
            ),
            Geometry::Ellipse { rect } => {
                let c = rect.center();
                writeln!(
                    self.body,
                    r#"  <ellipse cx="{}" cy="{}" rx="{}" ry="{}" {stroke}/>"#,
                    fmt_num(c.x),
                    fmt_num(c.y),
                    fmt_num(rect.width / 2.0),
                    fmt_num(rect.height / 2.0)
                )
            }
            Geometry::Rect { rect } => writeln!(
                self.body,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" {stroke}/>"#,
                fmt_num(rect.x),
                fmt_num(rect.y),
                fmt_num(rect.width),
                fmt_num(rect.height)
            ),
            // arc is the corner diameter
            Geometry::RoundedRect { rect, arc } => writeln!(
                self.body,
                r#"  <rect x="{}" y="{}" width="{}" height="{}" rx="{r}" ry="{r}" {stroke}/>"#,
                fmt_num(rect.x),
                fmt_num(rect.y),
                fmt_num(rect.width),
                fmt_num(rect.height),
                r = fmt_num(arc / 2.0)
            ),
        };
    }

    fn fill_polygon(&mut self, polygon: &[Point], color: Color) {
        let _ = writeln!(
            self.body,
            r#"  <polygon points="{}" fill="{}"{}/>"#,
            points_attr(polygon),
            color.to_css(),
            self.paint_opacity(color)
        );
    }

    fn draw_text_line(&mut self, line: &str, origin: Point, font: &FontSpec, color: Color) {
        let weight = if font.style.is_bold() { "bold" } else { "normal" };
        let style = if font.style.is_italic() { "italic" } else { "normal" };
        let _ = writeln!(
            self.body,
            r#"  <text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{weight}" font-style="{style}" fill="{}"{}>{}</text>"#,
            fmt_num(origin.x),
            fmt_num(origin.y),
            escape_xml(&font.name),
            font.size,
            color.to_css(),
            self.paint_opacity(color),
            escape_xml(line)
        );
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

/// Export the committed records of an editor, without preview or selection
pub fn export_svg(editor: &Editor) -> String {
    let mut surface = SvgSurface::new();
    for record in editor.shapes() {
        draw_record(&mut surface, record);
    }
    let config = editor.config();
    surface.finish(config.canvas_width, config.canvas_height)
}

/// Export the full editor frame, including preview and selection handles
pub fn export_frame_svg(editor: &Editor) -> String {
    let mut surface = SvgSurface::new();
    render(&mut surface, editor);
    let config = editor.config();
    surface.finish(config.canvas_width, config.canvas_height)
}

/// Save SVG to a file
pub fn save_svg(editor: &Editor, path: &Path) -> Result<()> {
    let svg = export_svg(editor);
    std::fs::write(path, svg).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fmt_num(p.x), fmt_num(p.y)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Numbers without trailing zeros, rounded to hundredths
fn fmt_num(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{rounded}")
}

/// Escape special XML characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagrammer_core::ShapeKind;
    use diagrammer_geometry::Rect;

    fn drawn(tool: ShapeKind, from: Point, to: Point) -> Editor {
        let mut editor = Editor::default();
        editor.set_tool(tool);
        editor.press(from);
        editor.drag(to);
        editor.release();
        editor
    }

    #[test]
    fn test_export_empty() {
        let svg = export_svg(&Editor::default());
        assert!(svg.starts_with("<?xml"));
        assert!(svg.contains(r#"viewBox="0 0 1600 1200""#));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_export_rectangle() {
        let editor = drawn(ShapeKind::Rectangle, Point::new(10.0, 20.0), Point::new(60.0, 50.0));
        let svg = export_svg(&editor);
        assert!(svg.contains(r##"<rect x="10" y="20" width="50" height="30" fill="none" stroke="#000000" stroke-width="3"/>"##));
    }

    #[test]
    fn test_export_rounded_rectangle_radius() {
        let editor = drawn(ShapeKind::RoundedRectangle, Point::new(0.0, 0.0), Point::new(80.0, 40.0));
        let svg = export_svg(&editor);
        // arc max(8, 40 / 4) = 10
        assert!(svg.contains(r#"rx="5" ry="5""#));
    }

    #[test]
    fn test_export_arrow_has_head_polygon() {
        let editor = drawn(ShapeKind::ArrowFilled, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        let svg = export_svg(&editor);
        assert!(svg.contains("<line"));
        assert!(svg.contains("<polygon"));
    }

    #[test]
    fn test_export_text_is_escaped() {
        let mut editor = Editor::default();
        editor.place_text("a < b & c", Rect::new(0.0, 0.0, 300.0, 40.0));
        let svg = export_svg(&editor);
        assert!(svg.contains("a &lt; b &amp; c</text>"));
        assert!(svg.contains(r#"font-family="SansSerif" font-size="20""#));
    }

    #[test]
    fn test_frame_includes_preview_and_selection() {
        let mut editor = drawn(ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0));
        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(30.0, 20.0));
        editor.release();
        editor.set_tool(ShapeKind::Oval);
        editor.press(Point::new(200.0, 200.0));
        editor.drag(Point::new(240.0, 220.0));

        let svg = export_frame_svg(&editor);
        assert!(svg.contains(r#"<ellipse cx="220" cy="210" rx="20" ry="10""#));
        assert!(svg.contains(r#"opacity="0.85""#));
        assert_eq!(svg.matches("#0000ff").count(), 5);

        let plain = export_svg(&editor);
        assert!(!plain.contains("<ellipse"));
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.svg");
        let editor = drawn(ShapeKind::Line, Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        save_svg(&editor, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<line"));
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(3.0), "3");
        assert_eq!(fmt_num(2.456), "2.46");
        assert_eq!(fmt_num(-0.001), "0");
    }
}
