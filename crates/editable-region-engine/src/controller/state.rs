//! Controller state machine.
//!
//! [`transition`] is pure: it maps the current state and a classified host
//! signal to the next state plus the side effects the controller must run,
//! in order. All host interaction lives in the controller itself.

use crate::controller::collaborator::ParagraphPolicy;
use crate::range::InlineRange;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditKind {
    InsertText(String),
    DeleteContent,
    InsertParagraph,
}

/// A collaborator invocation, with the range it applies to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    pub range: InlineRange,
}

impl Edit {
    pub fn insert_text(range: InlineRange, text: impl Into<String>) -> Self {
        Self {
            kind: EditKind::InsertText(text.into()),
            range,
        }
    }

    pub fn delete_content(range: InlineRange) -> Self {
        Self {
            kind: EditKind::DeleteContent,
            range,
        }
    }

    pub fn insert_paragraph(range: InlineRange) -> Self {
        Self {
            kind: EditKind::InsertParagraph,
            range,
        }
    }
}

/// An in-progress composition
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditSession {
    /// Selection when the composition started; the committed text lands here
    pub saved_range: Option<InlineRange>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ControllerState {
    #[default]
    Ready,
    Composing(EditSession),
    /// The host is applying edits it would not let us cancel; `queue` holds
    /// the collaborator calls to replay once they are rolled back
    AwaitingMutation { queue: Vec<Edit> },
}

impl ControllerState {
    pub fn is_ready(&self) -> bool {
        matches!(self, ControllerState::Ready)
    }

    pub fn is_composing(&self) -> bool {
        matches!(self, ControllerState::Composing(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ControllerState::Ready => "Ready",
            ControllerState::Composing(_) => "Composing",
            ControllerState::AwaitingMutation { .. } => "AwaitingMutation",
        }
    }
}

/// Host notification after classification
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// Insertion, deletion or paragraph intent with its resolved range
    Edit { edit: Edit, cancelable: bool },
    /// Intent kind the controller has no callback for
    Unhandled { cancelable: bool },
    /// Uncommitted composition text
    CompositionUpdate,
    /// Composition converted straight into an insertion
    InsertFromComposition { data: String },
    /// The host reports it applied an edit
    MutationApplied,
    CompositionStart { saved_range: Option<InlineRange> },
    CompositionEnd { data: String },
}

/// Side effects, executed in order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    ArmCapture,
    /// Stop capturing without rolling back
    DetachCapture,
    /// Roll back captured mutations and reselect the pre-mutation range
    Restore,
    Invoke(Edit),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub state: ControllerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(state: ControllerState, effects: Vec<Effect>) -> Self {
        Self { state, effects }
    }

    fn stay(state: ControllerState) -> Self {
        Self::to(state, Vec::new())
    }
}

fn admit(edit: Edit, paragraphs: ParagraphPolicy) -> Option<Edit> {
    match (&edit.kind, paragraphs) {
        (EditKind::InsertParagraph, ParagraphPolicy::Reject) => None,
        _ => Some(edit),
    }
}

fn commit(session: EditSession, data: String) -> Option<Effect> {
    if data.is_empty() {
        return None;
    }
    session
        .saved_range
        .map(|range| Effect::Invoke(Edit::insert_text(range, data)))
}

pub fn transition(state: ControllerState, signal: Signal, paragraphs: ParagraphPolicy) -> Transition {
    use ControllerState::*;

    match (state, signal) {
        (Ready, Signal::Edit { edit, cancelable }) => {
            let admitted = admit(edit, paragraphs);
            if cancelable {
                Transition::to(Ready, admitted.map(Effect::Invoke).into_iter().collect())
            } else {
                // Even a rejected edit must be rolled back once the host applies it
                Transition::to(
                    AwaitingMutation {
                        queue: admitted.into_iter().collect(),
                    },
                    vec![Effect::ArmCapture],
                )
            }
        }
        (Ready, Signal::Unhandled { cancelable: false }) => Transition::to(
            AwaitingMutation { queue: Vec::new() },
            vec![Effect::ArmCapture],
        ),
        (Ready, Signal::CompositionStart { saved_range }) => Transition::to(
            Composing(EditSession { saved_range }),
            vec![Effect::ArmCapture],
        ),
        (Ready, _) => Transition::stay(Ready),

        (Composing(session), Signal::CompositionEnd { data }) => {
            let mut effects = vec![Effect::Restore];
            effects.extend(commit(session, data));
            Transition::to(Ready, effects)
        }
        (Composing(session), Signal::InsertFromComposition { data }) => {
            let mut effects = vec![Effect::DetachCapture];
            effects.extend(commit(session, data));
            Transition::to(Ready, effects)
        }
        // Everything else during a composition is interior churn the
        // restore at composition end will erase
        (Composing(session), _) => Transition::stay(Composing(session)),

        (AwaitingMutation { queue }, Signal::MutationApplied) => {
            let mut effects = vec![Effect::Restore];
            effects.extend(queue.into_iter().map(Effect::Invoke));
            Transition::to(Ready, effects)
        }
        (AwaitingMutation { mut queue }, Signal::Edit { edit, .. }) => {
            queue.extend(admit(edit, paragraphs));
            Transition::stay(AwaitingMutation { queue })
        }
        (state @ AwaitingMutation { .. }, _) => Transition::stay(state),
    }
}
