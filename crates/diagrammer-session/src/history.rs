//! Undo/redo history of reversible edit commands.
//!
//! Each command carries full before/after snapshots of the record it
//! touched. In store-backed mode a snapshot with an entity id replays as a
//! store operation keyed by that id; otherwise it replays against the local
//! list by index, and an index that no longer fits is a silent no-op.

use diagrammer_core::{Document, Entity, ShapeRecord};
use tracing::debug;

/// A reversible edit
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A record was created at `index`. `entity` is the store snapshot used
    /// to re-add it on redo.
    Insert {
        index: usize,
        record: ShapeRecord,
        entity: Option<Entity>,
    },
    /// A record was deleted from `index`; Insert run backwards
    Remove {
        index: usize,
        record: ShapeRecord,
        entity: Option<Entity>,
    },
    /// A move or resize. `after` is missing if the record vanished before
    /// the gesture finished.
    Transform {
        index: usize,
        before: ShapeRecord,
        after: Option<ShapeRecord>,
    },
    EditText {
        index: usize,
        before: ShapeRecord,
        after: ShapeRecord,
    },
}

impl Command {
    pub fn label(&self) -> &'static str {
        match self {
            Command::Insert { .. } => "Add Shape",
            Command::Remove { .. } => "Delete",
            Command::Transform { .. } => "Move/Resize",
            Command::EditText { .. } => "Edit Text",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Command::Insert { index, .. }
            | Command::Remove { index, .. }
            | Command::Transform { index, .. }
            | Command::EditText { index, .. } => *index,
        }
    }

    /// Where a record at `position` ends up once this command is applied
    /// (`forward`) or reverted. None if it is the record taken out.
    pub fn shifted_index(&self, position: usize, forward: bool) -> Option<usize> {
        let inserts = match self {
            Command::Insert { .. } => forward,
            Command::Remove { .. } => !forward,
            Command::Transform { .. } | Command::EditText { .. } => return Some(position),
        };
        let index = self.index();
        if inserts {
            Some(if position >= index { position + 1 } else { position })
        } else if position == index {
            None
        } else {
            Some(if position > index { position - 1 } else { position })
        }
    }

    /// Perform the edit (redo). Returns false if it had no target.
    pub fn apply(&self, doc: &mut Document) -> bool {
        match self {
            Command::Insert { index, record, entity } => doc.restore(*index, record, entity.as_ref()),
            Command::Remove { index, record, .. } => doc.remove(*index, record),
            Command::Transform { index, after, .. } => match after {
                Some(after) => doc.replace(*index, after.clone()),
                None => false,
            },
            Command::EditText { index, after, .. } => doc.replace(*index, after.clone()),
        }
    }

    /// Reverse the edit (undo). Returns false if it had no target.
    pub fn revert(&self, doc: &mut Document) -> bool {
        match self {
            Command::Insert { index, record, .. } => doc.remove(*index, record),
            Command::Remove { index, record, entity } => doc.restore(*index, record, entity.as_ref()),
            Command::Transform { index, before, .. } | Command::EditText { index, before, .. } => {
                doc.replace(*index, before.clone())
            }
        }
    }
}

/// Manages undo/redo with a bounded command stack
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum history size
    max_history: usize,
}

impl History {
    pub fn new(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
        }
    }

    /// Record a completed edit. Clears the redo stack.
    pub fn push(&mut self, command: Command) {
        debug!(label = command.label(), index = command.index(), "history push");
        self.undo_stack.push(command);
        self.redo_stack.clear();

        // Limit history size
        while self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    /// Revert the newest command. Returns false if there was nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        let Some(command) = self.undo_stack.pop() else {
            return false;
        };
        if !command.revert(doc) {
            debug!(label = command.label(), index = command.index(), "undo target missing");
        }
        self.redo_stack.push(command);
        true
    }

    /// Re-apply the newest undone command. Returns false if there was nothing to redo.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        if !command.apply(doc) {
            debug!(label = command.label(), index = command.index(), "redo target missing");
        }
        self.undo_stack.push(command);
        true
    }

    /// The command [`History::undo`] would revert
    pub fn next_undo(&self) -> Option<&Command> {
        self.undo_stack.last()
    }

    /// The command [`History::redo`] would re-apply
    pub fn next_redo(&self) -> Option<&Command> {
        self.redo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_label(&self) -> Option<&'static str> {
        self.undo_stack.last().map(Command::label)
    }

    pub fn redo_label(&self) -> Option<&'static str> {
        self.redo_stack.last().map(Command::label)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diagrammer_core::{Color, ShapeKind};
    use diagrammer_geometry::Anchors;

    fn rect(x: f64) -> ShapeRecord {
        ShapeRecord::build(ShapeKind::Rectangle, Anchors::new(x, 0.0, x + 10.0, 10.0), Color::BLACK, 1.0)
    }

    fn doc_with(records: &[ShapeRecord]) -> Document {
        let mut doc = Document::local();
        for r in records {
            doc.append(r.clone());
        }
        doc
    }

    #[test]
    fn test_insert_undo_redo() {
        let mut doc = doc_with(&[rect(0.0)]);
        let mut history = History::default();
        history.push(Command::Insert {
            index: 0,
            record: rect(0.0),
            entity: None,
        });

        assert!(history.undo(&mut doc));
        assert!(doc.is_empty());
        assert!(history.redo(&mut doc));
        assert_eq!(doc.shapes(), &[rect(0.0)]);
    }

    #[test]
    fn test_remove_restores_at_index() {
        let mut doc = doc_with(&[rect(0.0), rect(50.0)]);
        let removed = rect(0.0);
        doc.remove(0, &removed);

        let mut history = History::default();
        history.push(Command::Remove {
            index: 0,
            record: removed.clone(),
            entity: None,
        });

        history.undo(&mut doc);
        assert_eq!(doc.shapes(), &[rect(0.0), rect(50.0)]);
    }

    #[test]
    fn test_transform_without_after_only_undoes() {
        let mut doc = doc_with(&[rect(5.0)]);
        let mut history = History::default();
        history.push(Command::Transform {
            index: 0,
            before: rect(0.0),
            after: None,
        });

        history.undo(&mut doc);
        assert_eq!(doc.shapes(), &[rect(0.0)]);
        history.redo(&mut doc);
        assert_eq!(doc.shapes(), &[rect(0.0)]);
    }

    #[test]
    fn test_stale_index_is_silent_noop() {
        let mut doc = doc_with(&[rect(0.0)]);
        let mut history = History::default();
        history.push(Command::EditText {
            index: 4,
            before: rect(1.0),
            after: rect(2.0),
        });

        assert!(history.undo(&mut doc));
        assert_eq!(doc.shapes(), &[rect(0.0)]);
        assert_eq!(history.redo_count(), 1);
    }

    #[test]
    fn test_push_clears_redo() {
        let mut doc = doc_with(&[rect(0.0)]);
        let mut history = History::default();
        history.push(Command::Insert {
            index: 0,
            record: rect(0.0),
            entity: None,
        });
        history.undo(&mut doc);
        assert!(history.can_redo());

        history.push(Command::Insert {
            index: 0,
            record: rect(9.0),
            entity: None,
        });
        assert!(!history.can_redo());
        assert_eq!(history.undo_label(), Some("Add Shape"));
    }

    #[test]
    fn test_history_limit_drops_oldest() {
        let mut history = History::new(3);
        for i in 0..5 {
            history.push(Command::Transform {
                index: i,
                before: rect(0.0),
                after: None,
            });
        }
        assert_eq!(history.undo_count(), 3);

        let mut doc = Document::local();
        history.undo(&mut doc);
        history.undo(&mut doc);
        history.undo(&mut doc);
        assert!(!history.undo(&mut doc));
        assert_eq!(history.redo_count(), 3);
    }

    #[test]
    fn test_shifted_index() {
        let remove = Command::Remove {
            index: 1,
            record: rect(0.0),
            entity: None,
        };
        // undoing the removal puts the record back at 1
        assert_eq!(remove.shifted_index(0, false), Some(0));
        assert_eq!(remove.shifted_index(1, false), Some(2));
        assert_eq!(remove.shifted_index(1, true), None);
        assert_eq!(remove.shifted_index(3, true), Some(2));

        let edit = Command::EditText {
            index: 0,
            before: rect(0.0),
            after: rect(1.0),
        };
        assert_eq!(edit.shifted_index(0, false), Some(0));
    }

    #[test]
    fn test_empty_history() {
        let mut doc = Document::local();
        let mut history = History::default();
        assert!(!history.undo(&mut doc));
        assert!(!history.redo(&mut doc));
        assert_eq!(history.undo_label(), None);
    }
}
