//! End-to-end editing behavior against a local document and a store-backed
//! document.

use std::sync::Arc;

use diagrammer_core::{Color, EntityId, EntityStore, MemoryStore, ShapeKind, ShapeRecord, entity_from_shape};
use diagrammer_geometry::{Anchors, Geometry, Point, Rect};
use diagrammer_session::{EditState, Editor, EditorConfig, Surface, render};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Mode {
    Local,
    Store,
}

const MODES: [Mode; 2] = [Mode::Local, Mode::Store];

fn editor(mode: Mode) -> (Editor, Option<Arc<MemoryStore>>) {
    match mode {
        Mode::Local => (Editor::default(), None),
        Mode::Store => {
            let store = Arc::new(MemoryStore::new());
            (Editor::with_store(EditorConfig::default(), store.clone()), Some(store))
        }
    }
}

fn draw(editor: &mut Editor, tool: ShapeKind, from: Point, to: Point) {
    editor.set_tool(tool);
    editor.press(from);
    editor.drag(to);
    editor.release();
}

fn select_at(editor: &mut Editor, at: Point) {
    editor.set_tool(ShapeKind::Select);
    editor.press(at);
    editor.release();
}

#[test]
fn test_move_round_trip_is_exact() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0));
        let original = editor.shapes()[0].clone();

        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(30.0, 20.0));
        editor.drag(Point::new(33.5, 21.25));
        editor.drag(Point::new(47.0, 29.0));
        editor.release();
        let moved = editor.shapes()[0].clone();
        assert_eq!(moved, original.translated(17.0, 9.0), "{mode:?}");

        assert!(editor.undo());
        assert_eq!(editor.shapes()[0].anchors, original.anchors, "{mode:?}");
        assert_eq!(editor.shapes()[0].geometry, original.geometry, "{mode:?}");

        assert!(editor.redo());
        assert_eq!(editor.shapes()[0], moved, "{mode:?}");
    }
}

#[test]
fn test_drag_of_many_events_is_one_undo_entry() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Oval, Point::new(0.0, 0.0), Point::new(100.0, 60.0));
        assert_eq!(editor.history().undo_count(), 1, "{mode:?}");

        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(50.0, 30.0));
        for step in 1..=25 {
            editor.drag(Point::new(50.0 + f64::from(step), 30.0));
        }
        editor.release();

        assert_eq!(editor.history().undo_count(), 2, "{mode:?}");
        assert_eq!(editor.history().undo_label(), Some("Move/Resize"));
        editor.undo();
        assert_eq!(editor.shapes()[0].bounds(), Rect::new(0.0, 0.0, 100.0, 60.0), "{mode:?}");
    }
}

#[test]
fn test_resize_past_opposite_corner_keeps_positive_bounds() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0));

        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(10.0, 40.0));
        assert!(matches!(editor.state(), EditState::Resizing(_)), "{mode:?}");
        editor.drag(Point::new(100.0, 0.0));
        editor.release();

        let bounds = editor.shapes()[0].bounds();
        assert!(bounds.width >= 0.0 && bounds.height >= 0.0, "{mode:?}: {bounds:?}");
        assert_eq!(bounds, Rect::new(60.0, 0.0, 40.0, 10.0), "{mode:?}");
    }
}

#[test]
fn test_resize_follows_current_bounds_across_drag_events() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0));

        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(10.0, 40.0));
        editor.drag(Point::new(100.0, 0.0));
        assert_eq!(editor.shapes()[0].bounds(), Rect::new(60.0, 0.0, 40.0, 10.0), "{mode:?}");

        // the bottom-left handle now sits on the flipped box
        editor.drag(Point::new(90.0, 5.0));
        editor.release();

        assert_eq!(editor.shapes()[0].bounds(), Rect::new(90.0, 0.0, 10.0, 5.0), "{mode:?}");
        assert_eq!(editor.history().undo_count(), 2, "{mode:?}");
        editor.undo();
        assert_eq!(editor.shapes()[0].bounds(), Rect::new(10.0, 10.0, 50.0, 30.0), "{mode:?}");
    }
}

#[test]
fn test_thin_line_picked_within_tolerance() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        editor.set_stroke_width(1.0);
        draw(&mut editor, ShapeKind::Line, Point::new(0.0, 100.0), Point::new(200.0, 100.0));

        select_at(&mut editor, Point::new(100.0, 106.0));
        assert_eq!(editor.selected(), Some(0), "{mode:?}");

        select_at(&mut editor, Point::new(100.0, 107.5));
        assert_eq!(editor.selected(), None, "{mode:?}");
    }
}

#[test]
fn test_external_removal_of_selection_clears_it() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());
    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
    select_at(&mut editor, Point::new(20.0, 20.0));
    assert_eq!(editor.selected(), Some(0));

    let id = editor.shapes()[0].external_id.unwrap();
    store.remove_entity(id);
    editor.pump();

    assert_eq!(editor.selected(), None);
    assert!(editor.shapes().is_empty());
    assert!(!editor.delete_selected());
}

#[test]
fn test_degenerate_arrow_renders_without_head() {
    #[derive(Default)]
    struct Collect {
        outlines: Vec<Geometry>,
        fills: usize,
    }

    impl Surface for Collect {
        fn draw_outline(&mut self, geometry: &Geometry, _color: Color, _width: f32) {
            self.outlines.push(geometry.clone());
        }

        fn fill_polygon(&mut self, _polygon: &[Point], _color: Color) {
            self.fills += 1;
        }

        fn draw_text_line(&mut self, _line: &str, _origin: Point, _font: &diagrammer_core::FontSpec, _color: Color) {}
    }

    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        editor.set_tool(ShapeKind::ArrowFilled);
        editor.press(Point::new(30.0, 30.0));
        editor.release();
        assert_eq!(editor.shapes().len(), 1, "{mode:?}");

        let mut surface = Collect::default();
        render(&mut surface, &editor);

        assert_eq!(surface.fills, 0, "{mode:?}");
        let [Geometry::Segment { start, end }] = surface.outlines.as_slice() else {
            panic!("{mode:?}: expected one shaft, got {:?}", surface.outlines);
        };
        assert_eq!(start, end);
        assert!(start.is_finite() && end.is_finite());
    }
}

#[test]
fn test_new_edit_after_undo_drops_redo() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
        assert!(editor.undo());
        assert!(editor.shapes().is_empty(), "{mode:?}");

        draw(&mut editor, ShapeKind::Oval, Point::new(100.0, 100.0), Point::new(140.0, 130.0));
        let before: Vec<ShapeRecord> = editor.shapes().to_vec();

        assert!(!editor.redo(), "{mode:?}");
        assert_eq!(editor.shapes(), before.as_slice(), "{mode:?}");
        assert_eq!(editor.status(), Some("Nothing to redo"));
    }
}

#[test]
fn test_delete_undo_restores_record() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
        draw(&mut editor, ShapeKind::Oval, Point::new(100.0, 0.0), Point::new(140.0, 40.0));
        draw(&mut editor, ShapeKind::Line, Point::new(200.0, 0.0), Point::new(240.0, 40.0));
        let shapes = editor.shapes().to_vec();

        select_at(&mut editor, Point::new(100.0, 20.0));
        assert_eq!(editor.selected(), Some(1), "{mode:?}");
        assert!(editor.delete_selected());
        assert_eq!(editor.shapes().len(), 2, "{mode:?}");

        editor.undo();
        assert_eq!(editor.shapes().len(), 3, "{mode:?}");
        match mode {
            Mode::Local => assert_eq!(editor.shapes(), shapes.as_slice()),
            // the store decides where a re-added entity lands
            Mode::Store => assert!(editor.shapes().iter().any(|r| r == &shapes[1])),
        }

        editor.redo();
        assert_eq!(editor.shapes().len(), 2, "{mode:?}");
    }
}

#[test]
fn test_text_edit_round_trip() {
    for mode in MODES {
        let (mut editor, _store) = editor(mode);
        editor.place_text("first", Rect::new(10.0, 10.0, 120.0, 40.0));
        editor.set_tool(ShapeKind::Select);
        editor.double_press(Point::new(20.0, 20.0));
        assert_eq!(editor.text_draft().map(|d| d.text.as_str()), Some("first"), "{mode:?}");

        editor.text_draft_mut().unwrap().text = "second".into();
        assert!(editor.commit_text());
        assert_eq!(editor.shapes()[0].text.as_deref(), Some("second"), "{mode:?}");
        if matches!(mode, Mode::Store) {
            assert!(editor.shapes()[0].external_id.is_some());
        }

        editor.undo();
        assert_eq!(editor.shapes()[0].text.as_deref(), Some("first"), "{mode:?}");
        editor.redo();
        assert_eq!(editor.shapes()[0].text.as_deref(), Some("second"), "{mode:?}");
    }
}

#[test]
fn test_deferred_create_is_undoable_before_it_appears() {
    let store = Arc::new(MemoryStore::deferred());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());

    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(30.0, 30.0));
    assert_eq!(store.len(), 1);
    assert!(editor.shapes().is_empty());
    assert_eq!(editor.history().undo_label(), Some("Add Shape"));

    assert_eq!(store.flush(), 1);
    assert!(editor.pump());
    assert_eq!(editor.shapes().len(), 1);

    editor.undo();
    store.flush();
    editor.pump();
    assert!(editor.shapes().is_empty());
    assert!(store.is_empty());
}

#[test]
fn test_undo_targets_newest_create_while_notification_is_queued() {
    let store = Arc::new(MemoryStore::deferred());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());

    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(30.0, 30.0));
    store.flush();
    editor.pump();

    // the oval's notification is still queued when undo runs
    draw(&mut editor, ShapeKind::Oval, Point::new(100.0, 0.0), Point::new(160.0, 40.0));
    assert!(editor.undo());
    store.flush();
    editor.pump();

    let kinds: Vec<ShapeKind> = editor.shapes().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![ShapeKind::Rectangle]);
    assert_eq!(editor.history().undo_count(), 1);
    assert_eq!(editor.history().redo_count(), 1);

    assert!(editor.redo());
    store.flush();
    editor.pump();
    let kinds: Vec<ShapeKind> = editor.shapes().iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![ShapeKind::Rectangle, ShapeKind::Oval]);
    assert!(!editor.can_redo());
}

#[test]
fn test_notifications_from_another_thread_wait_for_pump() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());
    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
    let existing = editor.shapes()[0].external_id.unwrap();
    let before = editor.shapes().to_vec();

    let added = ShapeRecord::build(
        ShapeKind::Oval,
        Anchors::new(100.0, 100.0, 150.0, 130.0),
        Color::BLACK,
        2.0,
    )
    .with_external_id(EntityId::new());
    let added_id = added.external_id.unwrap();
    let remote = Arc::clone(&store);
    std::thread::spawn(move || {
        remote.add_entity(entity_from_shape(&added));
        remote.remove_entity(existing);
    })
    .join()
    .unwrap();

    assert_eq!(editor.shapes(), before.as_slice());
    assert!(editor.pump());
    assert_eq!(editor.shapes().len(), 1);
    assert_eq!(editor.shapes()[0].external_id, Some(added_id));
    assert_eq!(editor.shapes()[0].kind, ShapeKind::Oval);
}

#[test]
fn test_selection_follows_entity_when_order_shifts() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());
    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
    draw(&mut editor, ShapeKind::Rectangle, Point::new(100.0, 0.0), Point::new(140.0, 40.0));
    select_at(&mut editor, Point::new(120.0, 20.0));
    let selected_id = editor.selected_record().and_then(|r| r.external_id);

    let first = editor.shapes()[0].external_id.unwrap();
    store.remove_entity(first);
    editor.pump();

    assert_eq!(editor.selected(), Some(0));
    assert_eq!(editor.selected_record().and_then(|r| r.external_id), selected_id);
}

#[test]
fn test_gesture_dropped_when_target_removed_mid_drag() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());
    draw(&mut editor, ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(40.0, 40.0));

    editor.set_tool(ShapeKind::Select);
    editor.press(Point::new(20.0, 20.0));
    editor.drag(Point::new(25.0, 20.0));

    let id = editor.shapes()[0].external_id.unwrap();
    store.remove_entity(id);
    editor.drag(Point::new(30.0, 20.0));
    editor.release();

    assert_eq!(editor.state(), &EditState::Idle);
    assert!(editor.shapes().is_empty());
    assert_eq!(editor.history().undo_label(), Some("Add Shape"));
}

#[test]
fn test_clear_in_both_modes() {
    for mode in MODES {
        let (mut editor, store) = editor(mode);
        for i in 0..4 {
            let x = f64::from(i) * 50.0;
            draw(&mut editor, ShapeKind::Rectangle, Point::new(x, 0.0), Point::new(x + 40.0, 40.0));
        }
        editor.clear();

        assert!(editor.shapes().is_empty(), "{mode:?}");
        assert!(!editor.can_undo(), "{mode:?}");
        if let Some(store) = store {
            assert!(store.is_empty());
        }
    }
}

#[test]
fn test_detaching_store_starts_fresh() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store.clone());
    draw(&mut editor, ShapeKind::Line, Point::new(0.0, 0.0), Point::new(40.0, 40.0));
    assert_eq!(store.subscriber_count(), 1);

    editor.set_store(None);
    assert_eq!(store.subscriber_count(), 0);
    assert!(editor.shapes().is_empty());
    assert!(!editor.document().is_store_backed());
    assert!(!editor.can_undo());

    editor.set_store(Some(store.clone()));
    assert_eq!(editor.shapes().len(), 1);
}

#[test]
fn test_freehand_survives_store_rebuild() {
    let store = Arc::new(MemoryStore::new());
    let mut editor = Editor::with_store(EditorConfig::default(), store);
    editor.set_tool(ShapeKind::Freehand);
    editor.press(Point::new(0.0, 0.0));
    for i in 1..=5 {
        editor.drag(Point::new(f64::from(i) * 10.0, f64::from(i % 2) * 10.0));
    }
    editor.release();

    assert_eq!(editor.shapes()[0].kind, ShapeKind::Freehand);
    assert_eq!(editor.shapes()[0].points().map(<[Point]>::len), Some(6));
}

proptest! {
    #[test]
    fn prop_any_drag_path_is_one_reversible_step(
        path in prop::collection::vec((-200i32..200, -200i32..200), 1..20),
        store_backed in any::<bool>(),
    ) {
        let (mut editor, _store) = editor(if store_backed { Mode::Store } else { Mode::Local });
        draw(&mut editor, ShapeKind::Rectangle, Point::new(10.0, 10.0), Point::new(60.0, 40.0));
        let original = editor.shapes()[0].clone();

        editor.set_tool(ShapeKind::Select);
        editor.press(Point::new(35.0, 25.0));
        for (x, y) in path {
            editor.drag(Point::new(f64::from(x), f64::from(y)));
        }
        editor.release();

        if editor.shapes()[0] == original {
            prop_assert_eq!(editor.history().undo_count(), 1);
        } else {
            prop_assert_eq!(editor.history().undo_count(), 2);
            prop_assert!(editor.undo());
            prop_assert_eq!(&editor.shapes()[0], &original);
        }
    }
}
