//! Editor state machine.
//!
//! Owns the document, the undo history, the current tool and style, the
//! selection and the in-progress gesture. Every public entry point first
//! applies pending store notifications, so the selection and gesture
//! targets are re-resolved by entity id before anything else happens.

use std::sync::Arc;

use diagrammer_core::{
    Appended, Color, Document, EntityStore, FontSpec, ShapeKind, ShapeRecord, entity_from_shape,
};
use diagrammer_geometry::{Anchors, Handle, Point, Rect, handle_hit};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EditorConfig;
use crate::history::{Command, History};

/// Text used when a default text box is added with nothing to say
pub const DEFAULT_TEXT: &str = "Text";

/// State for moving a record
#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub index: usize,
    pub last_mouse: Point,
    /// Record as it was at press time
    pub before: ShapeRecord,
    /// Record as last written during the drag
    pub current: ShapeRecord,
}

/// State for resizing a record by one of its corner handles
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub index: usize,
    pub handle: Handle,
    pub before: ShapeRecord,
    pub current: ShapeRecord,
}

/// Uncommitted contents of an open text edit
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraft {
    pub text: String,
    pub font: Option<FontSpec>,
    pub color: Color,
}

/// What the pointer is currently doing
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EditState {
    #[default]
    Idle,
    /// Drawing a new record with `tool`, pressed at `anchor`
    Creating { tool: ShapeKind, anchor: Point },
    Moving(DragState),
    Resizing(ResizeState),
    EditingText { index: usize, draft: TextDraft },
}

impl EditState {
    /// Index of the record this state operates on
    pub fn target(&self) -> Option<usize> {
        match self {
            EditState::Moving(drag) => Some(drag.index),
            EditState::Resizing(resize) => Some(resize.index),
            EditState::EditingText { index, .. } => Some(*index),
            EditState::Idle | EditState::Creating { .. } => None,
        }
    }

    fn target_mut(&mut self) -> Option<&mut usize> {
        match self {
            EditState::Moving(drag) => Some(&mut drag.index),
            EditState::Resizing(resize) => Some(&mut resize.index),
            EditState::EditingText { index, .. } => Some(index),
            EditState::Idle | EditState::Creating { .. } => None,
        }
    }

    /// A press-drag-release gesture is in progress
    pub fn is_gesture(&self) -> bool {
        matches!(self, EditState::Creating { .. } | EditState::Moving(_) | EditState::Resizing(_))
    }
}

/// Pointer input, in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    Press { at: Point },
    DoublePress { at: Point },
    Drag { at: Point },
    Release,
    Cancel,
}

/// Interactive editing session over a [`Document`]
#[derive(Debug)]
pub struct Editor {
    doc: Document,
    history: History,
    config: EditorConfig,
    tool: ShapeKind,
    color: Color,
    stroke_width: f32,
    selected: Option<usize>,
    state: EditState,
    /// Record being drawn, not yet part of the document
    preview: Option<ShapeRecord>,
    status_message: Option<String>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Editor {
    /// Editor over an empty local document
    pub fn new(config: EditorConfig) -> Self {
        let config = config.sanitized();
        Self {
            doc: Document::local(),
            history: History::new(config.history_limit),
            tool: ShapeKind::Select,
            color: config.color,
            stroke_width: config.stroke_width,
            selected: None,
            state: EditState::Idle,
            preview: None,
            status_message: None,
            config,
        }
    }

    /// Editor mirroring `store`
    pub fn with_store(config: EditorConfig, store: Arc<dyn EntityStore>) -> Self {
        let mut editor = Self::new(config);
        editor.set_store(Some(store));
        editor
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn shapes(&self) -> &[ShapeRecord] {
        self.doc.shapes()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn tool(&self) -> ShapeKind {
        self.tool
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_record(&self) -> Option<&ShapeRecord> {
        self.selected.and_then(|index| self.doc.get(index))
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn preview(&self) -> Option<&ShapeRecord> {
        self.preview.as_ref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Set a status message to display
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    pub fn text_draft(&self) -> Option<&TextDraft> {
        match &self.state {
            EditState::EditingText { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn text_draft_mut(&mut self) -> Option<&mut TextDraft> {
        match &mut self.state {
            EditState::EditingText { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Apply pending store notifications and re-resolve everything that
    /// refers to records by position. Returns true if the mirror was rebuilt.
    pub fn pump(&mut self) -> bool {
        let selected_id = self.selected.and_then(|i| self.doc.get(i)).and_then(|r| r.external_id);
        let target_id = match &self.state {
            EditState::Moving(drag) => drag.before.external_id,
            EditState::Resizing(resize) => resize.before.external_id,
            state => state.target().and_then(|i| self.doc.get(i)).and_then(|r| r.external_id),
        };

        if !self.doc.sync() {
            return false;
        }

        self.selected = selected_id.and_then(|id| self.doc.index_of(id));
        match target_id.and_then(|id| self.doc.index_of(id)) {
            Some(index) => {
                if let Some(target) = self.state.target_mut() {
                    *target = index;
                }
            }
            None if self.state.target().is_some() => {
                debug!("record under edit is gone, dropping gesture");
                self.state = EditState::Idle;
            }
            None => {}
        }

        true
    }

    pub fn handle(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::Press { at } => self.press(at),
            Gesture::DoublePress { at } => self.double_press(at),
            Gesture::Drag { at } => self.drag(at),
            Gesture::Release => self.release(),
            Gesture::Cancel => self.cancel(),
        }
    }

    pub fn press(&mut self, at: Point) {
        self.press_at(at, false);
    }

    /// A press with click count two; opens text records for editing
    pub fn double_press(&mut self, at: Point) {
        self.press_at(at, true);
    }

    fn press_at(&mut self, at: Point, double: bool) {
        self.pump();
        self.settle();

        match self.tool {
            ShapeKind::Select => self.press_select(at, double),
            ShapeKind::Text | ShapeKind::Delete => {}
            tool => self.begin_create(tool, at),
        }
    }

    fn press_select(&mut self, at: Point, double: bool) {
        let Some((index, record)) = self
            .doc
            .hit_test(at)
            .and_then(|index| Some((index, self.doc.get(index)?.clone())))
        else {
            self.selected = None;
            return;
        };

        if double && record.kind == ShapeKind::Text {
            self.begin_text_edit(index, &record);
            return;
        }

        self.selected = Some(index);
        self.state = match handle_hit(record.bounds(), at) {
            Some(handle) => {
                self.set_status("Resizing shape");
                EditState::Resizing(ResizeState {
                    index,
                    handle,
                    before: record.clone(),
                    current: record,
                })
            }
            None => {
                self.set_status("Selected shape - drag to move");
                EditState::Moving(DragState {
                    index,
                    last_mouse: at,
                    before: record.clone(),
                    current: record,
                })
            }
        };
    }

    fn begin_create(&mut self, tool: ShapeKind, at: Point) {
        self.preview = Some(match tool {
            ShapeKind::Freehand => ShapeRecord::freehand(vec![at], self.color, self.stroke_width),
            _ => ShapeRecord::build(tool, Anchors::from_points(at, at), self.color, self.stroke_width),
        });
        self.state = EditState::Creating { tool, anchor: at };
        self.set_status("Drawing...");
    }

    fn begin_text_edit(&mut self, index: usize, record: &ShapeRecord) {
        self.selected = Some(index);
        self.state = EditState::EditingText {
            index,
            draft: TextDraft {
                text: record.text.clone().unwrap_or_default(),
                font: record.font.clone(),
                color: record.color,
            },
        };
        self.set_status("Editing text");
    }

    pub fn drag(&mut self, at: Point) {
        self.pump();

        match &mut self.state {
            EditState::Creating { tool, anchor } => {
                let (tool, anchor) = (*tool, *anchor);
                self.preview = match (tool, self.preview.take()) {
                    (ShapeKind::Freehand, Some(path)) => Some(path.extended(at)),
                    _ => Some(ShapeRecord::build(
                        tool,
                        Anchors::from_points(anchor, at),
                        self.color,
                        self.stroke_width,
                    )),
                };
            }
            EditState::Moving(drag) => {
                let dx = at.x - drag.last_mouse.x;
                let dy = at.y - drag.last_mouse.y;
                drag.last_mouse = at;
                if dx == 0.0 && dy == 0.0 {
                    return;
                }
                drag.current = drag.current.translated(dx, dy);
                let (index, record) = (drag.index, drag.current.clone());
                self.doc.replace(index, record);
            }
            EditState::Resizing(resize) => {
                // The handle moves its corner of the current bounds
                resize.current = resize.current.resized(resize.handle, at);
                let (index, record) = (resize.index, resize.current.clone());
                self.doc.replace(index, record);
            }
            EditState::Idle | EditState::EditingText { .. } => {}
        }
    }

    pub fn release(&mut self) {
        self.pump();

        match std::mem::take(&mut self.state) {
            EditState::Creating { tool, .. } => {
                if let Some(record) = self.preview.take()
                    && !tool.is_tool_only()
                {
                    self.commit_new(record);
                }
                self.set_status("Ready");
            }
            EditState::Moving(DragState {
                index, before, current, ..
            })
            | EditState::Resizing(ResizeState {
                index, before, current, ..
            }) => {
                self.finish_transform(index, before, current);
                self.set_status("Ready");
            }
            other => self.state = other,
        }
    }

    /// Abort the current gesture or text edit. A move or resize keeps what
    /// was already written and is recorded as usual.
    pub fn cancel(&mut self) {
        self.pump();
        if matches!(self.state, EditState::EditingText { .. }) {
            self.cancel_text();
        } else {
            self.abandon_gesture();
        }
    }

    /// Close any open text edit or gesture
    fn settle(&mut self) {
        if matches!(self.state, EditState::EditingText { .. }) {
            self.commit_text();
        } else {
            self.abandon_gesture();
        }
    }

    fn abandon_gesture(&mut self) {
        match std::mem::take(&mut self.state) {
            EditState::Creating { .. } => self.preview = None,
            EditState::Moving(DragState {
                index, before, current, ..
            })
            | EditState::Resizing(ResizeState {
                index, before, current, ..
            }) => self.finish_transform(index, before, current),
            other => self.state = other,
        }
    }

    fn finish_transform(&mut self, index: usize, before: ShapeRecord, current: ShapeRecord) {
        if current == before {
            return;
        }
        let after = self.doc.get(index).map(|_| current);
        if after.is_none() {
            debug!(index, "transformed record vanished before release");
        }
        self.history.push(Command::Transform { index, before, after });
    }

    /// Add a new record and record its undo entry. In store mode the entry
    /// is keyed by the submitted entity id, so it is in history before the
    /// creation shows up in the mirror.
    fn commit_new(&mut self, record: ShapeRecord) {
        match self.doc.append(record.clone()) {
            Appended::Local(index) => {
                self.history.push(Command::Insert {
                    index,
                    record,
                    entity: None,
                });
            }
            Appended::Submitted(entity) => {
                let index = self.doc.len();
                self.history.push(Command::Insert {
                    index,
                    record: record.with_external_id(entity.id),
                    entity: Some(entity),
                });
                self.pump();
            }
        }
    }

    /// Commit the open text edit. Returns true if a text record changed.
    pub fn commit_text(&mut self) -> bool {
        self.pump();
        match std::mem::take(&mut self.state) {
            EditState::EditingText { index, draft } => {
                self.selected = Some(index);
                self.set_status("Ready");
                self.write_text(index, draft.text, draft.font, draft.color)
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Close the open text edit without changes
    pub fn cancel_text(&mut self) {
        if let EditState::EditingText { .. } = self.state {
            self.state = EditState::Idle;
            self.set_status("Ready");
        }
    }

    /// Replace the text, font and color of the selected text record
    pub fn update_selected_text(&mut self, text: impl Into<String>, font: Option<FontSpec>, color: Color) -> bool {
        self.pump();
        match self.selected {
            Some(index) => self.write_text(index, text.into(), font, color),
            None => false,
        }
    }

    fn write_text(&mut self, index: usize, text: String, font: Option<FontSpec>, color: Color) -> bool {
        let Some(before) = self.doc.get(index).cloned() else {
            return false;
        };
        if before.kind != ShapeKind::Text {
            return false;
        }
        let after = before.with_text(text, font, color);
        if after == before {
            return false;
        }
        if !self.doc.replace(index, after.clone()) {
            return false;
        }
        self.history.push(Command::EditText { index, before, after });
        self.pump();
        true
    }

    /// Create a text record in `rect`, sized to the box height
    pub fn place_text(&mut self, text: impl Into<String>, rect: Rect) {
        self.pump();
        self.settle();

        let rect = Rect::from_corners(rect.top_left(), rect.bottom_right());
        let font = FontSpec::for_box_height(rect.height);
        let record = ShapeRecord::text(text, font, rect, self.color, self.stroke_width);
        self.commit_new(record);
        self.set_status("Added text");
    }

    /// Create a record of `kind` centered on the canvas. Returns false for
    /// kinds that never produce a record.
    pub fn add_default_shape(&mut self, kind: ShapeKind) -> bool {
        if kind.is_tool_only() {
            return false;
        }
        if kind == ShapeKind::Text {
            self.add_default_text(DEFAULT_TEXT);
            return true;
        }

        self.pump();
        self.settle();

        let (w, h) = (self.config.canvas_width, self.config.canvas_height);
        let dw = (w / 6.0).clamp(40.0, 200.0);
        let dh = (h / 10.0).clamp(30.0, 150.0);
        let x = ((w - dw) / 2.0).max(10.0);
        let y = ((h - dh) / 2.0).max(10.0);

        let record = ShapeRecord::build(kind, Anchors::new(x, y, x + dw, y + dh), self.color, self.stroke_width);
        self.commit_new(record);
        self.set_status(format!("Added {}", kind.name()));
        true
    }

    /// Create a text record centered on the canvas
    pub fn add_default_text(&mut self, text: &str) {
        let text = if text.is_empty() { DEFAULT_TEXT } else { text };

        let (w, h) = (self.config.canvas_width, self.config.canvas_height);
        let dw = (w / 6.0).clamp(80.0, 300.0);
        let dh = (h / 12.0).clamp(20.0, 120.0);
        let x = ((w - dw) / 2.0).max(10.0);
        let y = ((h - dh) / 2.0).max(10.0);

        self.place_text(text, Rect::new(x, y, dw, dh));
    }

    /// Delete the selected record. Returns false if nothing was selected.
    pub fn delete_selected(&mut self) -> bool {
        self.pump();
        self.settle();

        let Some(index) = self.selected.take() else {
            return false;
        };
        let Some(record) = self.doc.get(index).cloned() else {
            return false;
        };
        let entity = record.external_id.map(|_| entity_from_shape(&record));
        if !self.doc.remove(index, &record) {
            return false;
        }
        self.history.push(Command::Remove { index, record, entity });
        self.pump();
        self.set_status("Deleted shape");
        true
    }

    /// Undo the last edit
    pub fn undo(&mut self) -> bool {
        self.pump();
        self.settle();

        let step = self.history.next_undo().cloned();
        let len = self.doc.len();
        let done = self.history.undo(&mut self.doc);
        self.after_history_step(step.as_ref(), false, len);
        self.set_status(if done { "Undo" } else { "Nothing to undo" });
        done
    }

    /// Redo the last undone edit
    pub fn redo(&mut self) -> bool {
        self.pump();
        self.settle();

        let step = self.history.next_redo().cloned();
        let len = self.doc.len();
        let done = self.history.redo(&mut self.doc);
        self.after_history_step(step.as_ref(), true, len);
        self.set_status(if done { "Redo" } else { "Nothing to redo" });
        done
    }

    /// Keep the selection on the same record after a local undo or redo
    /// inserted or removed one. Store-backed selections follow their id in
    /// `pump`.
    fn after_history_step(&mut self, step: Option<&Command>, forward: bool, len_before: usize) {
        if let Some(command) = step
            && !self.doc.is_store_backed()
            && self.doc.len() != len_before
        {
            self.selected = self.selected.and_then(|index| command.shifted_index(index, forward));
        }
        self.pump();
        self.selected = self.selected.filter(|&index| index < self.doc.len());
    }

    /// Switch to a different tool
    pub fn set_tool(&mut self, tool: ShapeKind) {
        self.pump();
        self.settle();
        if matches!(tool, ShapeKind::Select | ShapeKind::Text) {
            self.preview = None;
        }
        self.tool = tool;
        self.set_status(format!("Tool: {}", tool.name()));
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    /// Stroke width for new records; values below 1 are clamped
    pub fn set_stroke_width(&mut self, width: f32) {
        self.stroke_width = width.max(1.0);
    }

    /// Attach to a store, or detach with `None`. Either way the editor
    /// starts over: the previous records, selection and history are dropped.
    pub fn set_store(&mut self, store: Option<Arc<dyn EntityStore>>) {
        self.doc = match store {
            Some(store) => Document::backed_by(store, self.config.stroke_width),
            None => Document::local(),
        };
        self.selected = None;
        self.state = EditState::Idle;
        self.preview = None;
        self.history.clear();
        debug!(store_backed = self.doc.is_store_backed(), shapes = self.doc.len(), "document replaced");
    }

    /// Remove every record and forget the history
    pub fn clear(&mut self) {
        self.pump();
        self.state = EditState::Idle;
        self.preview = None;
        self.selected = None;
        self.doc.clear();
        self.pump();
        self.history.clear();
        self.set_status("Cleared");
    }
}
