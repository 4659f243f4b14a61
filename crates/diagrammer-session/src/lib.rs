//! Editing session for diagrammer: the gesture state machine, undo
//! history, configuration and frame rendering.

pub mod config;
pub mod editor;
pub mod history;
pub mod render;

pub use config::EditorConfig;
pub use editor::{DEFAULT_TEXT, DragState, EditState, Editor, Gesture, ResizeState, TextDraft};
pub use history::{Command, History};
pub use render::{PREVIEW_OPACITY, Surface, TextLine, draw_record, draw_selection, layout_text, render};
