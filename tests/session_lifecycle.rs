mod common;

use common::{begin_load, only_start, rendered, started, text_item};
use pdf_overlay::export::ManifestWriter;
use pdf_overlay::notification::NoticeLevel;
use pdf_overlay::overlay::controllers::{
    ClickOutcome, FreeTextState, Key, SelectionState, ShapeDrawState,
};
use pdf_overlay::overlay::{
    EditorSession, Effect, ElementId, LoadError, OverlayError, Placement, Point, RenderError,
    RenderPhase, RenderTarget, ShapeKind, ShapeStyle, SessionId, TextStyle, Tool,
};

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

/// Session with a document loaded; returns the document-ready render
fn loaded(page_count: usize) -> (EditorSession, SessionId, RenderTarget) {
    let mut session = EditorSession::default();
    let load = begin_load(&mut session);
    let effects = session.document_loaded(load, page_count);
    let (id, target) = only_start(&effects);
    (session, id, target)
}

fn loaded_with_hello() -> EditorSession {
    let (mut session, id, target) = loaded(2);
    let _ = session.on_render_complete(
        id,
        rendered(target, vec![text_item("Hello", 50.0, 50.0, 12.0, 40.0)]),
    );
    session
}

#[test]
fn hello_run_gets_position_and_mask() {
    let session = loaded_with_hello();

    let runs = session.model().text_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "Hello");
    assert_eq!(runs[0].id, ElementId::from("text-0"));
    assert!(close(runs[0].placement.x, 50.0));
    assert!(close(runs[0].placement.y, 50.0));
    assert!(close(runs[0].placement.rotation_degrees, 0.0));
    assert!(close(runs[0].style.font_size_px, 12.0));

    let masks = session.model().masks();
    assert_eq!(masks.len(), 1);
    assert_eq!(masks[0].id, ElementId::from("mask-0"));
    assert!(close(masks[0].x, 50.0));
    assert!(close(masks[0].y, 39.2));
    assert!(close(masks[0].width, 42.0));
    assert!(close(masks[0].height, 18.0));
}

#[test]
fn newer_render_wins_when_it_finishes_first() {
    let (mut session, first, first_target) = loaded(3);
    let effects = session.go_to_page(2);
    assert!(effects.contains(&Effect::CancelRender(first)));
    let (second, second_target) = only_start(&effects);

    let _ = session.on_render_complete(
        second,
        rendered(second_target, vec![text_item("Two", 10.0, 10.0, 10.0, 20.0)]),
    );
    let _ = session.on_render_complete(
        first,
        rendered(first_target, vec![text_item("One", 10.0, 10.0, 10.0, 20.0)]),
    );

    let runs = session.model().text_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "Two");
    assert_eq!(session.page_view().map(|v| v.page), Some(2));
}

#[test]
fn newer_render_wins_when_the_old_one_finishes_first() {
    let (mut session, first, first_target) = loaded(3);
    let effects = session.go_to_page(3);
    let (second, second_target) = only_start(&effects);

    let late = session.on_render_complete(
        first,
        rendered(first_target, vec![text_item("One", 10.0, 10.0, 10.0, 20.0)]),
    );
    assert!(late.is_empty());
    assert!(session.model().text_runs().is_empty());
    assert_eq!(session.phase(), RenderPhase::Rendering);

    let _ = session.on_render_complete(
        second,
        rendered(second_target, vec![text_item("Three", 10.0, 10.0, 10.0, 20.0)]),
    );
    assert_eq!(session.model().text_runs()[0].text, "Three");
    assert_eq!(session.phase(), RenderPhase::Stable);
}

#[test]
fn rerendering_the_same_target_does_not_cancel() {
    let (mut session, first, _) = loaded(1);
    let effects = session.request_render(1, 1.0);
    assert!(!effects.iter().any(|e| matches!(e, Effect::CancelRender(_))));
    let (second, _) = only_start(&effects);
    assert_ne!(first, second);
}

#[test]
fn repeated_render_of_one_page_keeps_one_run_and_mask() {
    let (mut session, _, _) = loaded(1);
    let hello = || vec![text_item("Hello", 50.0, 50.0, 12.0, 40.0)];

    let (first, target) = only_start(&session.request_render(1, 1.0));
    let (second, _) = only_start(&session.request_render(1, 1.0));
    let _ = session.on_render_complete(first, rendered(target, hello()));
    let _ = session.on_render_complete(second, rendered(target, hello()));
    assert_eq!(session.model().text_runs().len(), 1);
    assert_eq!(session.model().masks().len(), 1);
    assert_eq!(session.phase(), RenderPhase::Stable);

    // Accepting the same page again replaces rather than appends
    let (third, _) = only_start(&session.request_render(1, 1.0));
    let _ = session.on_render_complete(third, rendered(target, hello()));
    assert_eq!(session.model().text_runs().len(), 1);
    assert_eq!(session.model().masks().len(), 1);
}

#[test]
fn stabilization_retries_rerender_the_same_target() {
    let (mut session, id, target) = loaded(1);
    let effects = session.on_render_complete(id, rendered(target, vec![]));
    let tokens: Vec<_> = effects
        .iter()
        .filter_map(|e| match e {
            Effect::ScheduleRetry { token, .. } => Some(*token),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 3);

    for (i, token) in tokens.iter().enumerate() {
        let effects = session.on_retry_due(*token);
        let (retry, retry_target) = only_start(&effects);
        assert_eq!(retry_target, target);
        let follow_up = session.on_render_complete(retry, rendered(target, vec![]));
        assert!(started(&follow_up).is_empty());
        let expected = if i + 1 == tokens.len() {
            RenderPhase::Stable
        } else {
            RenderPhase::Rendering
        };
        assert_eq!(session.phase(), expected);
    }
}

#[test]
fn navigation_drops_pending_retries() {
    let (mut session, id, target) = loaded(2);
    let effects = session.on_render_complete(id, rendered(target, vec![]));
    let token = effects
        .iter()
        .find_map(|e| match e {
            Effect::ScheduleRetry { token, .. } => Some(*token),
            _ => None,
        })
        .unwrap();

    let _ = session.go_to_page(2);
    assert!(session.on_retry_due(token).is_empty());
}

#[test]
fn render_failure_clears_overlay_and_notifies() {
    let mut session = loaded_with_hello();
    let effects = session.go_to_page(2);
    let (id, _) = only_start(&effects);

    let effects = session.on_render_failed(id, &RenderError::engine("bad content stream"));
    assert!(effects.is_empty());
    assert!(session.model().text_runs().is_empty());
    assert!(session.model().masks().is_empty());
    assert!(session.page_view().is_none());
    assert_eq!(session.phase(), RenderPhase::Ready);

    let error = session
        .notices()
        .all()
        .iter()
        .find(|n| n.level == NoticeLevel::Error)
        .unwrap();
    assert!(error.message.contains("bad content stream"));
}

#[test]
fn unusable_document_leaves_session_idle() {
    let mut session = EditorSession::default();
    let load = begin_load(&mut session);
    let _ = session.load_failed(load, &LoadError::Parse("not a PDF".into()));
    assert_eq!(session.phase(), RenderPhase::Idle);
    assert!(session.go_to_page(1).is_empty());

    let load = begin_load(&mut session);
    assert!(started(&session.document_loaded(load, 0)).is_empty());
    assert_eq!(session.phase(), RenderPhase::Idle);
}

#[test]
fn late_failure_of_a_replaced_load_is_ignored() {
    let mut session = EditorSession::default();
    let first = begin_load(&mut session);
    let second = begin_load(&mut session);

    assert!(
        session
            .load_failed(first, &LoadError::Parse("truncated".into()))
            .is_empty()
    );
    let effects = session.document_loaded(second, 4);

    assert_eq!(session.page_count(), 4);
    assert_eq!(session.phase(), RenderPhase::Rendering);
    let (_, target) = only_start(&effects);
    assert_eq!(target, RenderTarget::new(1, 1.0));
    assert!(session.notices().all().is_empty());
}

#[test]
fn click_then_click_edits_in_place() {
    let mut session = loaded_with_hello();
    let id = ElementId::from("text-0");

    assert_eq!(session.click(&id).unwrap(), ClickOutcome::Selected(id.clone()));
    assert_eq!(
        session.click(&id).unwrap(),
        ClickOutcome::EditingStarted(id.clone())
    );
    session.edit_input("Goodbye").unwrap();
    assert_eq!(session.blur_edit().unwrap(), Some(id.clone()));

    assert_eq!(session.model().find_text(&id).unwrap().text, "Goodbye");
    assert!(session.has_unsaved_changes());
}

#[test]
fn blur_without_changes_commits_nothing() {
    let mut session = loaded_with_hello();
    let id = ElementId::from("text-0");
    session.click(&id).unwrap();
    session.click(&id).unwrap();
    assert_eq!(session.blur_edit().unwrap(), None);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn dragging_moves_by_pointer_delta() {
    let mut session = loaded_with_hello();
    let id = ElementId::from("text-0");
    session.select(&id).unwrap();

    assert!(session.begin_drag(&id, Point::new(55.0, 48.0)).unwrap());
    assert_eq!(session.drag_to(Point::new(75.0, 58.0)), Some(Point::new(70.0, 60.0)));
    assert_eq!(session.commit_drag().unwrap(), Some(Point::new(70.0, 60.0)));

    let run = session.model().find_text(&id).unwrap();
    assert_eq!(run.placement.origin(), Point::new(70.0, 60.0));
    assert!(session.has_unsaved_changes());
}

#[test]
fn drag_back_to_origin_is_not_a_change() {
    let mut session = loaded_with_hello();
    let id = ElementId::from("text-0");
    session.select(&id).unwrap();
    session.begin_drag(&id, Point::new(50.0, 50.0)).unwrap();
    session.drag_to(Point::new(80.0, 80.0));
    session.drag_to(Point::new(50.0, 50.0));
    assert_eq!(session.commit_drag().unwrap(), None);
    assert!(!session.has_unsaved_changes());
}

#[test]
fn delete_key_empties_selected_run() {
    let mut session = loaded_with_hello();
    let id = ElementId::from("text-0");

    assert_eq!(session.delete_selected(false).unwrap(), None);
    session.select(&id).unwrap();
    assert_eq!(session.delete_selected(true).unwrap(), None);
    assert_eq!(session.delete_selected(false).unwrap(), Some(id.clone()));

    assert_eq!(session.model().find_text(&id).unwrap().text, "");
    assert_eq!(session.model().masks().len(), 1);
    assert!(session.has_unsaved_changes());
}

#[test]
fn free_text_commits_on_enter_only_when_non_empty() {
    let mut session = loaded_with_hello();
    assert!(!session.place_text(Point::new(10.0, 10.0), TextStyle::default()));

    session.set_tool(Tool::Text);
    assert!(session.place_text(Point::new(10.0, 10.0), TextStyle::default()));
    session.type_text("   ").unwrap();
    assert_eq!(session.text_key(Key::Enter), None);

    assert!(session.place_text(Point::new(20.0, 30.0), TextStyle::default()));
    session.type_text("line one").unwrap();
    assert_eq!(session.text_key(Key::ShiftEnter), None);
    session.type_text("line one\nline two").unwrap();
    let id = session.text_key(Key::Enter).unwrap();

    let run = session.model().find_text(&id).unwrap();
    assert_eq!(run.text, "line one\nline two");
    assert_eq!(run.placement.origin(), Point::new(20.0, 30.0));
    assert_eq!(session.model().custom_text().len(), 1);
    assert_eq!(session.model().masks().len(), 1);
}

#[test]
fn short_shape_drags_are_discarded() {
    let mut session = loaded_with_hello();
    session.set_tool(Tool::Shape(ShapeKind::Rectangle));
    let style = ShapeStyle::default();

    session
        .begin_shape(Point::new(10.0, 10.0), ShapeKind::Rectangle, style)
        .unwrap();
    session.update_shape_preview(Point::new(13.0, 14.0));
    assert_eq!(session.commit_shape(), None);

    session
        .begin_shape(Point::new(10.0, 10.0), ShapeKind::Rectangle, style)
        .unwrap();
    session.update_shape_preview(Point::new(40.0, 30.0));
    let id = session.commit_shape().unwrap();

    let shape = session.model().find_shape(&id).unwrap();
    assert_eq!(shape.kind, ShapeKind::Rectangle);
    assert_eq!(session.model().shapes().len(), 1);
    assert!(matches!(
        session.click(&id),
        Err(OverlayError::NotSelectable(_))
    ));
}

#[test]
fn horizontal_shape_drag_commits_a_flat_box() {
    let mut session = loaded_with_hello();
    session.set_tool(Tool::Shape(ShapeKind::Rectangle));

    session
        .begin_shape(Point::new(10.0, 10.0), ShapeKind::Rectangle, ShapeStyle::default())
        .unwrap();
    session.update_shape_preview(Point::new(20.0, 10.0));
    let id = session.commit_shape().unwrap();

    let shape = session.model().find_shape(&id).unwrap();
    assert_eq!(
        shape.placement,
        Placement {
            x: 10.0,
            y: 10.0,
            width: Some(10.0),
            height: Some(0.0),
            rotation_degrees: 0.0,
        }
    );
    assert_eq!(shape.end, Point::new(20.0, 10.0));
}

#[test]
fn one_interaction_at_a_time() {
    let hello = ElementId::from("text-0");

    // drag, then shape
    let mut session = loaded_with_hello();
    session.set_tool(Tool::Shape(ShapeKind::Circle));
    session.select(&hello).unwrap();
    assert!(session.begin_drag(&hello, Point::new(50.0, 40.0)).unwrap());
    session
        .begin_shape(Point::new(200.0, 200.0), ShapeKind::Circle, ShapeStyle::default())
        .unwrap();
    assert!(matches!(session.shape_state(), ShapeDrawState::Drawing { .. }));
    assert_eq!(session.selection_state(), &SelectionState::Unselected);
    assert_eq!(session.commit_drag().unwrap(), None);

    // shape, then drag
    session.select(&hello).unwrap();
    assert!(session.begin_drag(&hello, Point::new(50.0, 40.0)).unwrap());
    assert_eq!(session.shape_state(), &ShapeDrawState::Idle);
    assert_eq!(session.commit_shape(), None);

    // text placement, then drag
    session.set_tool(Tool::Text);
    assert!(session.place_text(Point::new(300.0, 300.0), TextStyle::default()));
    session.select(&hello).unwrap();
    assert!(session.begin_drag(&hello, Point::new(50.0, 40.0)).unwrap());
    assert_eq!(session.free_text_state(), &FreeTextState::Idle);
    assert!(matches!(session.selection_state(), SelectionState::Dragging { .. }));

    // drag, then text placement
    assert!(session.place_text(Point::new(300.0, 300.0), TextStyle::default()));
    assert_eq!(session.selection_state(), &SelectionState::Unselected);
    assert!(matches!(session.free_text_state(), FreeTextState::Placing { .. }));
    assert!(session.model().shapes().is_empty());
}

#[test]
fn user_elements_survive_page_changes() {
    let mut session = loaded_with_hello();
    session.set_tool(Tool::Text);
    session.place_text(Point::new(5.0, 5.0), TextStyle::default());
    session.type_text("note").unwrap();
    let id = session.text_key(Key::Enter).unwrap();

    let effects = session.go_to_page(2);
    let (render, target) = only_start(&effects);
    let _ = session.on_render_complete(render, rendered(target, vec![]));

    assert!(session.model().find_text(&id).is_some());
    assert!(session.model().text_runs().is_empty());
}

#[test]
fn applying_changes_clears_the_unsaved_flag() {
    let mut session = loaded_with_hello();
    session
        .edit_text(&ElementId::from("text-0"), "Hello there")
        .unwrap();
    assert!(session.has_unsaved_changes());

    let mut writer = ManifestWriter::new();
    let bytes = session.apply_changes(&mut writer, b"%PDF-1.7").unwrap();
    assert!(!bytes.is_empty());
    assert!(!session.has_unsaved_changes());

    let manifest: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let edits = &manifest["pages"][0]["text_edits"];
    assert_eq!(edits[0]["text"], "Hello there");
    assert_eq!(edits[0]["original_text"], "Hello");
}

#[test]
fn failed_apply_keeps_changes_unsaved() {
    let mut session = loaded_with_hello();
    session.delete_text(&ElementId::from("text-0")).unwrap();

    let mut writer = ManifestWriter::new();
    assert!(session.apply_changes(&mut writer, &[]).is_err());
    assert!(session.has_unsaved_changes());
}
