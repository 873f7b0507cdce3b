use editable_region_engine::controller::{
    ControllerState, Edit, EditKind, EditSession, Effect, ParagraphPolicy, Signal, Transition, transition,
};
use editable_region_engine::{Document, InlineRange, Markup, Path};

fn range() -> InlineRange {
    let mut doc = Document::new();
    let host = doc.build(&Markup::element("p", vec![Markup::text("ab")]));
    InlineRange::caret(&doc, host, Path::from([0]), 1).unwrap()
}

fn states() -> Vec<ControllerState> {
    vec![
        ControllerState::Ready,
        ControllerState::Composing(EditSession {
            saved_range: Some(range()),
        }),
        ControllerState::Composing(EditSession::default()),
        ControllerState::AwaitingMutation { queue: Vec::new() },
        ControllerState::AwaitingMutation {
            queue: vec![Edit::insert_text(range(), "x")],
        },
    ]
}

fn signals() -> Vec<Signal> {
    let mut signals = Vec::new();
    for cancelable in [true, false] {
        signals.push(Signal::Edit {
            edit: Edit::insert_text(range(), "y"),
            cancelable,
        });
        signals.push(Signal::Edit {
            edit: Edit::delete_content(range()),
            cancelable,
        });
        signals.push(Signal::Edit {
            edit: Edit::insert_paragraph(range()),
            cancelable,
        });
        signals.push(Signal::Unhandled { cancelable });
    }
    signals.extend([
        Signal::CompositionUpdate,
        Signal::InsertFromComposition {
            data: "に".to_string(),
        },
        Signal::MutationApplied,
        Signal::CompositionStart {
            saved_range: Some(range()),
        },
        Signal::CompositionEnd {
            data: "に".to_string(),
        },
        Signal::CompositionEnd {
            data: String::new(),
        },
    ]);
    signals
}

fn every_transition() -> impl Iterator<Item = (ControllerState, Signal, ParagraphPolicy, Transition)> {
    states().into_iter().flat_map(|state| {
        signals().into_iter().flat_map(move |signal| {
            let state = state.clone();
            [ParagraphPolicy::Reject, ParagraphPolicy::Forward]
                .into_iter()
                .map(move |policy| {
                    let next = transition(state.clone(), signal.clone(), policy);
                    (state.clone(), signal.clone(), policy, next)
                })
        })
    })
}

#[test]
fn collaborator_is_only_invoked_on_the_way_to_ready() {
    for (state, signal, policy, next) in every_transition() {
        let invokes = next
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::Invoke(_)));
        if invokes {
            assert!(
                next.state.is_ready(),
                "{state:?} + {signal:?} ({policy:?}) invoked without returning to Ready"
            );
        }
    }
}

#[test]
fn capture_is_only_armed_from_ready() {
    for (state, signal, policy, next) in every_transition() {
        if next.effects.contains(&Effect::ArmCapture) {
            assert!(
                state.is_ready(),
                "{state:?} + {signal:?} ({policy:?}) armed capture twice"
            );
            assert!(!next.state.is_ready());
        }
    }
}

#[test]
fn leaving_a_captured_state_releases_capture_first() {
    for (state, signal, policy, next) in every_transition() {
        if !state.is_ready() && next.state.is_ready() {
            assert!(
                matches!(
                    next.effects.first(),
                    Some(Effect::Restore | Effect::DetachCapture)
                ),
                "{state:?} + {signal:?} ({policy:?}) left capture armed"
            );
        }
    }
}

#[test]
fn rejected_paragraphs_never_reach_the_collaborator() {
    for (state, signal, policy, next) in every_transition() {
        if policy != ParagraphPolicy::Reject {
            continue;
        }
        for effect in &next.effects {
            if let Effect::Invoke(edit) = effect {
                assert!(
                    !matches!(edit.kind, EditKind::InsertParagraph),
                    "{state:?} + {signal:?} forwarded a paragraph"
                );
            }
        }
    }
}
