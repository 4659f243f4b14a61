//! Gesture scripts: a JSON list of editor steps replayed headlessly.
//!
//! ```json
//! [
//!   { "op": "tool", "tool": "Rectangle" },
//!   { "op": "press", "x": 10, "y": 10 },
//!   { "op": "drag", "x": 80, "y": 50 },
//!   { "op": "release" },
//!   { "op": "undo" }
//! ]
//! ```

use anyhow::{Context, Result, bail};
use diagrammer_core::{Color, ShapeKind};
use diagrammer_geometry::{Point, Rect};
use diagrammer_session::Editor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One scripted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Tool {
        tool: String,
    },
    Press {
        x: f64,
        y: f64,
    },
    DoublePress {
        x: f64,
        y: f64,
    },
    Drag {
        x: f64,
        y: f64,
    },
    Release,
    Cancel,
    Undo,
    Redo,
    Delete,
    /// Create a text box
    PlaceText {
        text: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Replace the draft of the open text edit
    TypeText {
        text: String,
    },
    CommitText,
    CancelText,
    /// Draw color as `#rrggbb`
    Color {
        color: String,
    },
    Stroke {
        width: f32,
    },
    AddShape {
        kind: String,
    },
    AddText {
        #[serde(default)]
        text: String,
    },
    Clear,
    /// Deliver queued store notifications
    Flush,
}

/// Parse a script from JSON
pub fn parse(source: &str) -> Result<Vec<Step>> {
    serde_json::from_str(source).context("invalid script")
}

/// Replay `steps` against `editor`. `flush` delivers queued store
/// notifications and returns how many were sent.
pub fn run(editor: &mut Editor, steps: &[Step], mut flush: impl FnMut() -> usize) -> Result<()> {
    for (i, step) in steps.iter().enumerate() {
        apply(editor, step, &mut flush).with_context(|| format!("step {} ({step:?})", i + 1))?;
    }
    Ok(())
}

fn apply(editor: &mut Editor, step: &Step, flush: &mut impl FnMut() -> usize) -> Result<()> {
    match step {
        Step::Tool { tool } => editor.set_tool(shape_kind(tool)?),
        Step::Press { x, y } => editor.press(Point::new(*x, *y)),
        Step::DoublePress { x, y } => editor.double_press(Point::new(*x, *y)),
        Step::Drag { x, y } => editor.drag(Point::new(*x, *y)),
        Step::Release => editor.release(),
        Step::Cancel => editor.cancel(),
        Step::Undo => {
            editor.undo();
        }
        Step::Redo => {
            editor.redo();
        }
        Step::Delete => {
            editor.delete_selected();
        }
        Step::PlaceText {
            text,
            x,
            y,
            width,
            height,
        } => editor.place_text(text.as_str(), Rect::new(*x, *y, *width, *height)),
        Step::TypeText { text } => match editor.text_draft_mut() {
            Some(draft) => draft.text = text.clone(),
            None => bail!("no text edit is open"),
        },
        Step::CommitText => {
            editor.commit_text();
        }
        Step::CancelText => editor.cancel_text(),
        Step::Color { color } => editor.set_color(parse_color(color)?),
        Step::Stroke { width } => editor.set_stroke_width(*width),
        Step::AddShape { kind } => {
            let kind = shape_kind(kind)?;
            if !editor.add_default_shape(kind) {
                bail!("{kind} cannot be added as a shape");
            }
        }
        Step::AddText { text } => editor.add_default_text(text),
        Step::Clear => editor.clear(),
        Step::Flush => {
            let delivered = flush();
            debug!(delivered, "flushed store notifications");
            editor.pump();
        }
    }
    Ok(())
}

fn shape_kind(name: &str) -> Result<ShapeKind> {
    ShapeKind::from_name(name).with_context(|| format!("unknown tool {name:?}"))
}

/// Parse `#rrggbb` (or `rrggbb`) into an opaque color
pub fn parse_color(s: &str) -> Result<Color> {
    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        bail!("expected #rrggbb, got {s:?}");
    }
    let value = u32::from_str_radix(hex, 16).with_context(|| format!("invalid color {s:?}"))?;
    Ok(Color(0xFF00_0000 | value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_run() {
        let steps = parse(
            r#"[
                { "op": "tool", "tool": "rectangle" },
                { "op": "press", "x": 10, "y": 10 },
                { "op": "drag", "x": 60, "y": 40 },
                { "op": "release" },
                { "op": "tool", "tool": "select" },
                { "op": "press", "x": 30, "y": 20 },
                { "op": "drag", "x": 40, "y": 20 },
                { "op": "release" },
                { "op": "undo" }
            ]"#,
        )
        .unwrap();

        let mut editor = Editor::default();
        run(&mut editor, &steps, || 0).unwrap();
        assert_eq!(editor.shapes().len(), 1);
        assert_eq!(editor.shapes()[0].bounds(), Rect::new(10.0, 10.0, 50.0, 30.0));
        assert!(editor.can_redo());
    }

    #[test]
    fn test_text_steps() {
        let steps = parse(
            r#"[
                { "op": "place_text", "text": "hi", "x": 0, "y": 0, "width": 100, "height": 30 },
                { "op": "double_press", "x": 10, "y": 10 },
                { "op": "type_text", "text": "bye" },
                { "op": "commit_text" }
            ]"#,
        )
        .unwrap();

        let mut editor = Editor::default();
        run(&mut editor, &steps, || 0).unwrap();
        assert_eq!(editor.shapes()[0].text.as_deref(), Some("bye"));
    }

    #[test]
    fn test_unknown_tool_reports_step() {
        let steps = parse(r#"[{ "op": "release" }, { "op": "tool", "tool": "lasso" }]"#).unwrap();
        let err = run(&mut Editor::default(), &steps, || 0).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("step 2"), "{message}");
        assert!(message.contains("unknown tool"), "{message}");
    }

    #[test]
    fn test_type_text_without_edit_fails() {
        let steps = parse(r#"[{ "op": "type_text", "text": "x" }]"#).unwrap();
        assert!(run(&mut Editor::default(), &steps, || 0).is_err());
    }

    #[test]
    fn test_add_select_shape_fails() {
        let steps = parse(r#"[{ "op": "add_shape", "kind": "Select" }]"#).unwrap();
        assert!(run(&mut Editor::default(), &steps, || 0).is_err());
    }

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000").unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(parse_color("0000ff").unwrap(), Color::BLUE);
        assert!(parse_color("#fff").is_err());
        assert!(parse_color("#gggggg").is_err());
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse(r#"[{ "op": "teleport" }]"#).is_err());
    }
}
