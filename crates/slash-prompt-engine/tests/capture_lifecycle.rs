use pretty_assertions::assert_eq;
use rstest::rstest;
use slash_prompt_engine::page::{BoundaryRange, EventKind, InputType, NodeKind};
use slash_prompt_engine::{
    Anchor, EngineConfig, GenerationResponse, InsertOutcome, Key, KeyOutcome, KeyPress, Mode,
    Modifiers, NodeId, Page, PendingGeneration, Platform, Point, PromptEngine, Resolution,
    TextField,
};

fn engine() -> PromptEngine {
    PromptEngine::new(EngineConfig {
        platform: Platform::Other,
        ..EngineConfig::default()
    })
}

fn flat_page(field: TextField) -> (Page, NodeId) {
    let mut page = Page::new();
    let id = page.create_field(field);
    page.append_child(page.document(), id).unwrap();
    page.focus(id);
    (page, id)
}

/// `<div contenteditable>` holding one text node with the caret at `caret`
fn rich_page(text: &str, caret: usize) -> (Page, NodeId, NodeId) {
    let mut page = Page::new();
    let root = page.create_editable("div");
    page.append_child(page.document(), root).unwrap();
    let node = page.create_text(text);
    page.append_child(root, node).unwrap();
    page.focus(root);
    page.collapse_selection(Point::new(node, caret));
    (page, root, node)
}

fn type_text(engine: &mut PromptEngine, page: &mut Page, text: &str) {
    for c in text.chars() {
        engine.handle_key(page, KeyPress::char(c));
    }
}

fn submit(engine: &mut PromptEngine, page: &mut Page) -> PendingGeneration {
    match engine.handle_key(page, KeyPress::new(Key::Enter, Modifiers::ctrl())) {
        KeyOutcome::Submitted(pending) => pending,
        other => panic!("expected a submission, got {other:?}"),
    }
}

fn describe(page: &Page, root: NodeId) -> Vec<String> {
    page.children(root)
        .iter()
        .map(|&c| match page.kind(c) {
            Some(NodeKind::Text(text)) => format!("text:{text}"),
            Some(NodeKind::LineBreak) => "br".to_string(),
            Some(NodeKind::Marker(_)) => "marker".to_string(),
            other => format!("{other:?}"),
        })
        .collect()
}

#[rstest]
#[case::at_end("/ai", 3, "", 0)]
#[case::after_text("Hello /ai", 9, "Hello ", 6)]
#[case::mid_value("ab/aicd", 5, "abcd", 2)]
#[case::upper_case("x/AI", 4, "x", 1)]
#[case::multibyte("héllo/Ai wörld", 8, "héllo wörld", 5)]
fn flat_trigger_is_removed_at_caret(
    #[case] value: &str,
    #[case] caret: usize,
    #[case] remaining: &str,
    #[case] offset: usize,
) {
    let (mut page, field) = flat_page(TextField::textarea(value));
    page.field_mut(field).unwrap().set_caret(caret);

    let mut engine = engine();
    assert!(engine.handle_input(&mut page, field));

    assert_eq!(engine.mode(), Mode::CapturingFlat);
    assert_eq!(page.field(field).unwrap().value(), remaining);
    assert_eq!(page.field(field).unwrap().caret(), offset);
    assert_eq!(
        engine.session().unwrap().anchor(),
        &Anchor::Flat { field, offset }
    );
}

#[rstest]
#[case::too_short("ai", 2)]
#[case::not_before_caret("/ai later", 9)]
#[case::different_text("/aj", 3)]
fn flat_without_trigger_starts_nothing(#[case] value: &str, #[case] caret: usize) {
    let (mut page, field) = flat_page(TextField::textarea(value));
    page.field_mut(field).unwrap().set_caret(caret);

    let mut engine = engine();
    assert!(!engine.handle_input(&mut page, field));
    assert_eq!(engine.mode(), Mode::Idle);
    assert_eq!(page.field(field).unwrap().value(), value);
}

#[test]
fn non_text_inputs_are_ignored() {
    let (mut page, field) = flat_page(TextField::input(InputType::Number, "/ai"));
    let mut engine = engine();
    assert!(!engine.handle_input(&mut page, field));
}

#[test]
fn flat_capture_round_trip() {
    let (mut page, field) = flat_page(TextField::textarea("Hello /ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);

    type_text(&mut engine, &mut page, "greet the world");
    assert_eq!(page.field(field).unwrap().value(), "Hello ");

    let pending = submit(&mut engine, &mut page);
    assert_eq!(pending.request.prompt_text, "greet the world");

    let resolution = engine.resolve(
        &mut page,
        pending.ticket,
        GenerationResponse::success("world"),
    );
    assert_eq!(resolution, Resolution::Inserted(InsertOutcome::Inserted));
    assert_eq!(engine.mode(), Mode::Idle);

    let written = page.field(field).unwrap();
    assert_eq!(written.value(), "Hello world");
    assert_eq!(written.selection(), 11..11);
    let kinds: Vec<EventKind> = page.events().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::Input, EventKind::Change]);
}

#[test]
fn rich_capture_inserts_lines_at_marker() {
    let (mut page, root, _) = rich_page("Hi /ai", 6);
    let mut engine = engine();
    let target = page.children(root)[0];
    assert!(engine.handle_input(&mut page, target));
    assert_eq!(engine.mode(), Mode::CapturingRich);
    assert_eq!(describe(&page, root), vec!["text:Hi ", "marker"]);

    type_text(&mut engine, &mut page, "two lines");
    let pending = submit(&mut engine, &mut page);
    let resolution = engine.resolve(&mut page, pending.ticket, GenerationResponse::success("A\nB"));

    assert_eq!(resolution, Resolution::Inserted(InsertOutcome::Inserted));
    assert_eq!(
        describe(&page, root),
        vec!["text:Hi ", "text:A", "br", "text:B"]
    );
    assert_eq!(
        page.selection(),
        Some(BoundaryRange::collapsed(Point::new(root, 4)))
    );
    assert_eq!(page.events().len(), 1);
    assert_eq!(page.events()[0].target, root);
}

#[test]
fn rich_trigger_split_across_nodes() {
    let mut page = Page::new();
    let root = page.create_editable("div");
    page.append_child(page.document(), root).unwrap();
    let bold = page.create_element("b");
    page.append_child(root, bold).unwrap();
    let first = page.create_text("note /");
    page.append_child(bold, first).unwrap();
    let second = page.create_text("ai");
    page.append_child(root, second).unwrap();
    page.focus(root);
    page.collapse_selection(Point::new(second, 2));

    let mut engine = engine();
    assert!(engine.handle_input(&mut page, second));
    assert_eq!(page.text_content(root), "note ");
    assert!(engine.session().unwrap().anchor().is_valid(&page));
}

#[test]
fn rich_marker_removed_by_host_falls_back_to_selection() {
    let (mut page, root, _) = rich_page("Hi /ai", 6);
    let mut engine = engine();
    let target = page.children(root)[0];
    engine.handle_input(&mut page, target);
    let pending = submit(&mut engine, &mut page);

    // The host editor re-renders and drops unknown nodes
    let marker = engine.session().unwrap().anchor().marker_node(&page).unwrap();
    page.remove(marker).unwrap();
    let text = page.children(root)[0];
    page.collapse_selection(Point::new(text, 3));

    let resolution = engine.resolve(&mut page, pending.ticket, GenerationResponse::success("A\nB"));
    assert_eq!(resolution, Resolution::Inserted(InsertOutcome::FellBack));
    assert_eq!(page.text_content(root), "Hi A\nB");
}

#[test]
fn escape_leaves_surface_as_after_trigger_removal() {
    let (mut page, field) = flat_page(TextField::textarea("Hello /ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    let after_trigger = format!("{page:?}");

    type_text(&mut engine, &mut page, "some words");
    engine.handle_key(&mut page, KeyPress::plain(Key::Backspace));
    assert_eq!(
        engine.handle_key(&mut page, KeyPress::plain(Key::Escape)),
        KeyOutcome::Consumed
    );

    assert_eq!(engine.mode(), Mode::Idle);
    assert_eq!(format!("{page:?}"), after_trigger);
}

#[test]
fn escape_removes_rich_marker() {
    let (mut page, root, _) = rich_page("Hi /ai", 6);
    let mut engine = engine();
    let target = page.children(root)[0];
    engine.handle_input(&mut page, target);
    type_text(&mut engine, &mut page, "abc");

    engine.handle_key(&mut page, KeyPress::plain(Key::Escape));
    assert_eq!(describe(&page, root), vec!["text:Hi "]);
}

#[test]
fn late_response_after_reset_changes_nothing() {
    let (mut page, field) = flat_page(TextField::textarea("Hello /ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    let pending = submit(&mut engine, &mut page);
    engine.handle_key(&mut page, KeyPress::plain(Key::Escape));

    let before = format!("{page:?}");
    let resolution = engine.resolve(&mut page, pending.ticket, GenerationResponse::success("late"));
    assert_eq!(resolution, Resolution::Discarded);
    assert_eq!(format!("{page:?}"), before);
}

#[test]
fn late_response_does_not_reach_a_newer_session() {
    let (mut page, field) = flat_page(TextField::textarea("/ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    let stale = submit(&mut engine, &mut page);
    engine.cancel(&mut page);

    page.field_mut(field).unwrap().assign_value("again /ai".into());
    assert!(engine.handle_input(&mut page, field));
    let fresh = submit(&mut engine, &mut page);
    assert_ne!(stale.ticket, fresh.ticket);

    let before = format!("{page:?}");
    assert_eq!(
        engine.resolve(&mut page, stale.ticket, GenerationResponse::success("old")),
        Resolution::Discarded
    );
    assert_eq!(format!("{page:?}"), before);

    assert_eq!(
        engine.resolve(&mut page, fresh.ticket, GenerationResponse::success("new")),
        Resolution::Inserted(InsertOutcome::Inserted)
    );
    assert_eq!(page.field(field).unwrap().value(), "again new");
}

#[test]
fn failed_submission_leaves_trigger_removed() {
    let (mut page, field) = flat_page(TextField::textarea("Hello /ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    type_text(&mut engine, &mut page, "x");
    let pending = submit(&mut engine, &mut page);

    engine.resolve(
        &mut page,
        pending.ticket,
        GenerationResponse::failure("API error 500: boom"),
    );
    let overlay = engine.overlay(&page).unwrap();
    assert_eq!(
        overlay.body,
        slash_prompt_engine::OverlayBody::Error("API error 500: boom".to_string())
    );

    assert!(engine.expire_failure(&mut page, pending.ticket.session));
    assert_eq!(page.field(field).unwrap().value(), "Hello ");
    assert!(page.events().is_empty());
}

#[test]
fn detached_rich_root_cancels_on_next_key() {
    let (mut page, root, _) = rich_page("/ai", 3);
    let mut engine = engine();
    let target = page.children(root)[0];
    engine.handle_input(&mut page, target);

    page.remove(root).unwrap();
    assert_eq!(
        engine.handle_key(&mut page, KeyPress::char('a')),
        KeyOutcome::PassThrough
    );
    assert_eq!(engine.mode(), Mode::Idle);
}

#[test]
fn suggestion_keys_drive_the_palette() {
    let (mut page, field) = flat_page(TextField::textarea("/ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);

    type_text(&mut engine, &mut page, "by /t");
    engine.handle_key(&mut page, KeyPress::plain(Key::ArrowDown));
    engine.handle_key(&mut page, KeyPress::plain(Key::Tab));
    assert_eq!(
        engine.session().unwrap().buffer().as_str(),
        "by /tomorrow"
    );

    // Closed list: Enter no longer accepts
    engine.handle_key(&mut page, KeyPress::plain(Key::Enter));
    assert_eq!(
        engine.session().unwrap().buffer().as_str(),
        "by /tomorrow"
    );
}

#[rstest]
#[case::tab(Key::Tab)]
#[case::enter(Key::Enter)]
fn plain_accept_keys_complete_token_without_submitting(#[case] key: Key) {
    let (mut page, field) = flat_page(TextField::textarea("/ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    type_text(&mut engine, &mut page, "/we");
    assert!(engine.session().unwrap().suggestions().is_visible());

    assert_eq!(
        engine.handle_key(&mut page, KeyPress::plain(key)),
        KeyOutcome::Consumed
    );

    let session = engine.session().unwrap();
    assert_eq!(session.buffer().as_str(), "/weekday");
    assert!(!session.suggestions().is_visible());
    assert_eq!(session.phase(), &slash_prompt_engine::Phase::Editing);
}

#[test]
fn arrow_up_wraps_to_last_suggestion() {
    let (mut page, field) = flat_page(TextField::textarea("/ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    type_text(&mut engine, &mut page, "/da");

    assert_eq!(
        engine.handle_key(&mut page, KeyPress::plain(Key::ArrowUp)),
        KeyOutcome::Consumed
    );
    assert_eq!(engine.session().unwrap().suggestions().selected_index(), 1);

    engine.handle_key(&mut page, KeyPress::plain(Key::Tab));
    assert_eq!(engine.session().unwrap().buffer().as_str(), "/datetime");
}

#[test]
fn submit_shortcut_wins_over_open_suggestions() {
    let (mut page, field) = flat_page(TextField::textarea("/ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    type_text(&mut engine, &mut page, "/we");
    assert!(engine.session().unwrap().suggestions().is_visible());

    let pending = submit(&mut engine, &mut page);
    assert_eq!(pending.request.prompt_text, "/we");
}

#[test]
fn paste_shortcut_cannot_shift_the_anchor() {
    let (mut page, field) = flat_page(TextField::textarea("Hello /ai"));
    let mut engine = engine();
    engine.handle_input(&mut page, field);
    type_text(&mut engine, &mut page, "x");

    for press in [
        KeyPress::new(Key::Char('v'), Modifiers::ctrl()),
        KeyPress::new(Key::Backspace, Modifiers::ctrl()),
        KeyPress::new(Key::Char('z'), Modifiers::ctrl()),
    ] {
        assert_eq!(engine.handle_key(&mut page, press), KeyOutcome::Consumed);
    }

    let pending = submit(&mut engine, &mut page);
    engine.resolve(&mut page, pending.ticket, GenerationResponse::success("world"));
    assert_eq!(page.field(field).unwrap().value(), "Hello world");
}
