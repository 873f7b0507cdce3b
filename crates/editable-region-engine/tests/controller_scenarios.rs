use std::cell::RefCell;
use std::rc::Rc;

use editable_region_engine::{
    BridgeHooks, CaretFixer, Controller, Document, EditHandler, HostEvent, HostSupport, InlineRange, InputIntent,
    InputKind, LiveSelection, Markup, PlainText, PlainTextCall, SimulatedHost, StaticRange, SurfaceOptions,
};
use pretty_assertions::assert_eq;

fn plain(text: &str) -> SimulatedHost<PlainText> {
    SimulatedHost::mount(
        &SurfaceOptions::default(),
        &HostSupport::assume_supported(),
        PlainText::new(text),
        PlainText::markup,
    )
    .unwrap()
}

fn caret_offset(host: &SimulatedHost<PlainText>) -> usize {
    let caret = host.selected_range().unwrap().expect("caret inside region");
    assert!(caret.is_collapsed());
    caret.start.offset
}

fn calls(host: &SimulatedHost<PlainText>) -> Vec<String> {
    host.handler().calls().iter().map(ToString::to_string).collect()
}

#[test]
fn cancelable_insert_is_applied_by_collaborator() {
    let mut host = plain("cat");
    let text = host.text_node().unwrap();
    host.select_text(3, 3).unwrap();

    let dispatch = host
        .before_input(InputIntent::insert_text("s", StaticRange::caret(text, 3)))
        .unwrap();

    assert!(dispatch.default_prevented);
    assert_eq!(calls(&host), vec![r#"insert_text([3, 3], "s")"#]);
    assert_eq!(host.handler().text(), "cats");
    assert_eq!(host.text(), "cats");
    assert_eq!(caret_offset(&host), 4);
    // the host never touched the tree itself
    assert!(host.frames().is_empty());
}

#[test]
fn cancelable_delete_is_applied_by_collaborator() {
    let mut host = plain("cats");
    let text = host.text_node().unwrap();

    host.before_input(InputIntent::delete(
        InputKind::DeleteContentBackward,
        StaticRange::new(text, 3, text, 4),
    ))
    .unwrap();

    assert_eq!(
        host.handler().calls(),
        &[PlainTextCall::DeleteContent { start: 3, end: 4 }]
    );
    assert_eq!(host.text(), "cat");
    assert_eq!(caret_offset(&host), 3);
}

#[test]
fn uncontrolled_insert_is_rolled_back_then_replayed() {
    let mut host = plain("ab");
    host.select_text(1, 1).unwrap();

    host.before_input(
        InputIntent::new(InputKind::InsertText)
            .with_data("x")
            .cancelable(false),
    )
    .unwrap();

    assert_eq!(host.frames(), &["axb".to_string()]);
    assert_eq!(calls(&host), vec![r#"insert_text([1, 1], "x")"#]);
    assert_eq!(host.text(), "axb");
    assert_eq!(caret_offset(&host), 2);
    assert!(host.controller().state().is_ready());
}

/// Drives the controller directly to look at the tree between rollback and
/// the collaborator's re-render
#[test]
fn uncontrolled_insert_restores_tree_and_selection_before_callback() {
    #[derive(Default)]
    struct Seen {
        calls: Vec<(String, String)>,
    }
    impl EditHandler for Seen {
        fn insert_text(&mut self, range: &InlineRange, text: &str, _caret: &mut CaretFixer) {
            self.calls.push((range.to_string(), text.to_string()));
        }
        fn delete_content(&mut self, _range: &InlineRange, _caret: &mut CaretFixer) {}
    }

    let mut doc = Document::new();
    let mut controller = Controller::mount(
        &mut doc,
        &SurfaceOptions::default(),
        &HostSupport::assume_supported(),
        Seen::default(),
    );
    controller.render(&mut doc, &[Markup::text("ab")]).unwrap();
    let text = doc.children(controller.root())[0];
    doc.set_selection(LiveSelection::caret(text, 1));

    let intent = InputIntent::insert_text("x", StaticRange::caret(text, 1)).cancelable(false);
    controller
        .handle(&mut doc, HostEvent::BeforeInput(intent))
        .unwrap();
    assert!(controller.handler().calls.is_empty());

    // the host applies the edit it would not let us cancel
    doc.insert_data(text, 1, "x").unwrap();
    doc.set_selection(LiveSelection::caret(text, 2));
    assert_eq!(doc.text_content(controller.root()), "axb");

    controller
        .handle(&mut doc, HostEvent::Input(InputKind::InsertText))
        .unwrap();

    assert_eq!(doc.text_content(controller.root()), "ab");
    assert_eq!(doc.selection(), Some(LiveSelection::caret(text, 1)));
    assert_eq!(
        controller.handler().calls,
        vec![("[0]@1..[0]@1".to_string(), "x".to_string())]
    );
}

#[test]
fn composition_commits_once() {
    let mut host = plain("ab");
    host.select_text(1, 1).unwrap();

    host.compose(&["n", "ni"], "に").unwrap();

    // intermediate text was on screen but never reached the collaborator
    assert_eq!(host.frames(), &["anb".to_string(), "anib".to_string()]);
    assert_eq!(calls(&host), vec![r#"insert_text([1, 1], "に")"#]);
    assert_eq!(host.text(), "aにb");
    assert_eq!(caret_offset(&host), 2);
    assert!(!host.composition().is_active());
}

#[test]
fn cancelled_composition_leaves_model_alone() {
    let mut host = plain("ab");
    host.select_text(1, 1).unwrap();

    host.compose(&["n"], "").unwrap();

    assert!(host.handler().calls().is_empty());
    assert_eq!(host.text(), "ab");
}

#[test]
fn insert_from_composition_keeps_host_text() {
    let mut doc = Document::new();
    let mut controller = Controller::mount(
        &mut doc,
        &SurfaceOptions::default(),
        &HostSupport::assume_supported(),
        PlainText::new("ab"),
    );
    controller.render(&mut doc, &[Markup::text("ab")]).unwrap();
    let node = doc.children(controller.root())[0];
    doc.set_selection(LiveSelection::caret(node, 1));

    controller
        .handle(&mut doc, HostEvent::CompositionStart)
        .unwrap();
    doc.insert_data(node, 1, "ni").unwrap();
    controller
        .handle(
            &mut doc,
            HostEvent::BeforeInput(
                InputIntent::new(InputKind::InsertFromComposition)
                    .with_data("に")
                    .with_target(StaticRange::new(node, 1, node, 3))
                    .cancelable(false),
            ),
        )
        .unwrap();
    controller
        .handle(
            &mut doc,
            HostEvent::CompositionEnd {
                data: "に".to_string(),
            },
        )
        .unwrap();

    // capture was detached without rollback; the collaborator saw one insertion
    assert_eq!(doc.text_content(controller.root()), "anib");
    assert_eq!(
        controller.handler().calls(),
        &[PlainTextCall::InsertText {
            start: 1,
            end: 1,
            text: "に".to_string()
        }]
    );
    assert!(controller.state().is_ready());
}

#[test]
fn bridge_reports_each_caret_once_and_skips_composition() {
    let reports: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let sink = reports.clone();
    let mut host = plain("ab").with_bridge(BridgeHooks::new(move |range| {
        sink.borrow_mut().push(range.map(ToString::to_string));
    }));

    host.select_text(1, 1).unwrap();
    host.select_text(1, 1).unwrap();
    host.compose(&["n", "ni"], "に").unwrap();

    assert_eq!(
        *reports.borrow(),
        vec![
            Some("[0]@1..[0]@1".to_string()),
            Some("[0]@2..[0]@2".to_string()),
        ]
    );
}

#[test]
fn unsupported_host_is_read_only() {
    let mut host = SimulatedHost::mount(
        &SurfaceOptions::default(),
        &HostSupport::from_user_agent("Mozilla/5.0 (X11; Linux x86_64; rv:60.0) Gecko/20100101 Firefox/60.0"),
        PlainText::new("ab"),
        PlainText::markup,
    )
    .unwrap();

    host.before_input(InputIntent::new(InputKind::InsertText).with_data("x"))
        .unwrap();
    host.compose(&["n"], "に").unwrap();

    insta::assert_snapshot!(
        host.doc().outer_html(host.root()),
        @"<p>Support for Input Event level 1 or higher is required.</p>"
    );
    assert!(host.handler().calls().is_empty());
}
