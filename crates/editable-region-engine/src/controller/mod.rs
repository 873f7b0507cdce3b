/*!
 * # Edit Interception Controller
 *
 * The controller owns one editable root and stands between the host's
 * input events and the collaborator that owns the text model.
 *
 * ## Event Flow
 *
 * 1. **Classify**: a host notification becomes a [`Signal`]; insertion and
 *    deletion intents get their target resolved to an [`InlineRange`]
 * 2. **Transition**: the pure [`state::transition`] picks the next state and
 *    the effects to run
 * 3. **Execute**: effects arm, detach or restore [`MutationCapture`] and
 *    invoke the collaborator
 *
 * Cancelable intents are suppressed and handed to the collaborator straight
 * away. Non-cancelable ones let the host mutate the tree, then roll the
 * mutation back when the host says it is done and replay the edit as a
 * collaborator call. Compositions are captured the same way and committed as
 * a single insertion.
 *
 * ## Caret Placement
 *
 * Collaborators register a thunk through [`CaretFixer`] instead of returning
 * a range, because the nodes the caret belongs in only exist after the next
 * [`Controller::render`]. `render` evaluates the thunk once the new children
 * are in place.
 *
 * ## Single Writer
 *
 * While capture is armed the host owns the tree. Renders requested in that
 * window are deferred until the controller is back to `Ready`.
 */

pub mod collaborator;
pub mod intent;
pub mod state;

use std::collections::BTreeMap;

pub use collaborator::{CaretFixer, CaretThunk, EditHandler, ParagraphPolicy};
pub use intent::{HostEvent, InputIntent, InputKind};
pub use state::{ControllerState, Edit, EditKind, EditSession, Effect, Signal, Transition, transition};

use crate::capture::MutationCapture;
use crate::dom::{Document, Markup, NodeId};
use crate::error::EditError;
use crate::range::InlineRange;
use crate::support::HostSupport;

/// Shown instead of the editable surface when the host cannot be intercepted
pub const FALLBACK_NOTICE: &str = "Support for Input Event level 1 or higher is required.";

/// How the editable root element is created
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            tag: "p".to_string(),
            attributes: BTreeMap::new(),
        }
    }
}

/// What the controller did with a host event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Dispatch {
    /// The host must not apply its default action (only honoured when the
    /// intent was cancelable)
    pub default_prevented: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Children replaced; `caret` is where the collaborator's thunk placed it
    Applied { caret: Option<InlineRange> },
    /// The host owns the tree; the markup is applied once it is released
    Deferred,
    /// Fallback notice in place, nothing to render into
    Static,
}

pub struct Controller<H> {
    root: NodeId,
    interactive: bool,
    handler: H,
    paragraphs: ParagraphPolicy,
    state: ControllerState,
    capture: MutationCapture,
    caret: CaretFixer,
    deferred: Option<Vec<Markup>>,
}

impl<H: EditHandler> Controller<H> {
    /// Create the editable root in `doc`.
    ///
    /// When `support` rules out interception, the root is a static paragraph
    /// holding [`FALLBACK_NOTICE`] and every event is ignored.
    pub fn mount(doc: &mut Document, options: &SurfaceOptions, support: &HostSupport, handler: H) -> Self {
        let interactive = match support.check() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{e}; rendering a read-only notice instead");
                false
            }
        };

        let root = if interactive {
            let mut attributes = options.attributes.clone();
            attributes.insert("contenteditable".to_string(), "true".to_string());
            doc.create_element_with(options.tag.clone(), attributes)
        } else {
            doc.build(&Markup::element("p", vec![Markup::text(FALLBACK_NOTICE)]))
        };

        let paragraphs = handler.paragraph_policy();
        Self {
            root,
            interactive,
            handler,
            paragraphs,
            state: ControllerState::Ready,
            capture: MutationCapture::new(),
            caret: CaretFixer::new(),
            deferred: None,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// A collaborator asked for caret placement the next render has to run
    pub fn has_pending_caret(&self) -> bool {
        self.caret.is_pending()
    }

    /// Handle one host notification
    pub fn handle(&mut self, doc: &mut Document, event: HostEvent) -> Result<Dispatch, EditError> {
        if !self.interactive {
            return Ok(Dispatch::default());
        }

        // Deliver whatever the host mutated since the last event
        self.capture.collect(doc);

        let mut dispatch = Dispatch::default();
        let signal = match event {
            HostEvent::BeforeInput(intent) => {
                // Suppress everything; the host ignores this for non-cancelable intents
                dispatch.default_prevented = intent.cancelable;
                self.classify(doc, &intent)?
            }
            HostEvent::Input(kind) => {
                log::trace!("host applied {kind}");
                Signal::MutationApplied
            }
            HostEvent::CompositionStart => Signal::CompositionStart {
                saved_range: self.selected_range(doc)?,
            },
            HostEvent::CompositionEnd { data } => Signal::CompositionEnd { data },
        };

        self.step(doc, signal)?;
        Ok(dispatch)
    }

    /// Replace the region's children with `markup`, then place the caret if
    /// the last collaborator call asked for it
    pub fn render(&mut self, doc: &mut Document, markup: &[Markup]) -> Result<RenderOutcome, EditError> {
        if !self.interactive {
            return Ok(RenderOutcome::Static);
        }
        if !self.state.is_ready() || self.capture.is_observing() {
            log::debug!("region is owned by the host, deferring render");
            self.deferred = Some(markup.to_vec());
            return Ok(RenderOutcome::Deferred);
        }

        self.deferred = None;
        doc.replace_children(self.root, markup)?;
        let caret = self.fix_caret(doc)?;
        Ok(RenderOutcome::Applied { caret })
    }

    fn fix_caret(&mut self, doc: &mut Document) -> Result<Option<InlineRange>, EditError> {
        let Some(thunk) = self.caret.take() else {
            return Ok(None);
        };
        let range = thunk(doc, self.root)?;
        log::debug!("placing caret at {range}");
        range.select_range(doc)?;
        Ok(Some(range))
    }

    fn classify(&self, doc: &Document, intent: &InputIntent) -> Result<Signal, EditError> {
        let data = || intent.data.clone().unwrap_or_default();

        let edit = match &intent.kind {
            InputKind::InsertCompositionText => return Ok(Signal::CompositionUpdate),
            InputKind::InsertFromComposition => {
                return Ok(Signal::InsertFromComposition { data: data() });
            }
            InputKind::Other(name) => {
                log::debug!("no callback for {name}");
                return Ok(Signal::Unhandled {
                    cancelable: intent.cancelable,
                });
            }
            _ if self.state.is_composing() => return Ok(Signal::CompositionUpdate),
            InputKind::InsertText => Edit::insert_text(self.target_range(doc, intent)?, data()),
            InputKind::InsertParagraph => Edit::insert_paragraph(self.target_range(doc, intent)?),
            InputKind::DeleteContent
            | InputKind::DeleteContentBackward
            | InputKind::DeleteContentForward => {
                Edit::delete_content(self.target_range(doc, intent)?)
            }
        };

        Ok(Signal::Edit {
            edit,
            cancelable: intent.cancelable,
        })
    }

    fn target_range(&self, doc: &Document, intent: &InputIntent) -> Result<InlineRange, EditError> {
        match &intent.target {
            Some(target) => InlineRange::from_static_range(doc, self.root, target),
            None => self.selected_range(doc)?.ok_or(EditError::NoSelection),
        }
    }

    fn selected_range(&self, doc: &Document) -> Result<Option<InlineRange>, EditError> {
        match doc.selection() {
            Some(selection) => InlineRange::from_selection(doc, self.root, &selection),
            None => Ok(None),
        }
    }

    fn step(&mut self, doc: &mut Document, signal: Signal) -> Result<(), EditError> {
        let previous = std::mem::take(&mut self.state);
        if matches!(previous, ControllerState::AwaitingMutation { .. })
            && matches!(
                signal,
                Signal::CompositionStart { .. } | Signal::CompositionEnd { .. }
            )
        {
            log::warn!("ignoring composition event while the host owns the region");
        }
        let from = previous.name();
        let Transition { state, effects } = transition(previous, signal, self.paragraphs);
        if from != state.name() {
            log::debug!("{from} -> {}", state.name());
        }
        self.state = state;

        for effect in effects {
            self.run(doc, effect)?;
        }

        // Deferred markup predates any edit just replayed, so it goes in
        // without touching the caret; the collaborator's next render does that
        if self.state.is_ready()
            && !self.capture.is_observing()
            && let Some(markup) = self.deferred.take()
        {
            doc.replace_children(self.root, &markup)?;
        }
        Ok(())
    }

    fn run(&mut self, doc: &mut Document, effect: Effect) -> Result<(), EditError> {
        match effect {
            Effect::ArmCapture => self.capture.attach(doc, self.root),
            Effect::DetachCapture => {
                self.capture.detach(doc);
                Ok(())
            }
            Effect::Restore => {
                let restored = self.capture.restore(doc)?;
                if let Some(range) = restored {
                    log::debug!("restored selection {range}");
                }
                Ok(())
            }
            Effect::Invoke(edit) => self.invoke(doc, edit),
        }
    }

    fn invoke(&mut self, doc: &Document, edit: Edit) -> Result<(), EditError> {
        let range = edit.range.revalidate(doc)?;
        match edit.kind {
            EditKind::InsertText(text) => {
                log::debug!("insert {text:?} at {range}");
                self.handler.insert_text(&range, &text, &mut self.caret);
            }
            EditKind::DeleteContent => {
                log::debug!("delete {range}");
                self.handler.delete_content(&range, &mut self.caret);
            }
            EditKind::InsertParagraph => {
                log::debug!("paragraph at {range}");
                self.handler.insert_paragraph(&range, &mut self.caret);
            }
        }
        Ok(())
    }
}
