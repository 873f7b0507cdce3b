/*!
 * # Selection Bridge
 *
 * Keeps an application-level [`InlineRange`] in step with the host's live
 * selection for one managed region.
 *
 * On every selection-change notification the bridge classifies the live
 * selection against the region:
 *
 * - **Inside**: both ends in the region; normalised and reported upward
 * - **Overlapping**: one end in the region; handed to the overlap hook, or
 *   treated as outside when no hook is registered
 * - **Outside**: reported upward as `None`
 *
 * Reports are deduplicated against the last value sent, so hosts that fire
 * several notifications for one user gesture produce a single update.
 * Notifications are ignored while the shared [`CompositionSession`] is
 * active.
 *
 * After the application re-renders, [`SelectionBridge::after_render`] puts its
 * range back onto the live selection without writing when they already agree.
 */

use std::cell::Cell;
use std::rc::Rc;

use crate::dom::{Document, LiveSelection, NodeId};
use crate::error::EditError;
use crate::range::InlineRange;

/// Shared flag marking an active input-method composition.
///
/// Clones share the flag; whoever receives composition start and end from the
/// host flips it, and every bridge handed a clone observes it.
#[derive(Clone, Debug, Default)]
pub struct CompositionSession(Rc<Cell<bool>>);

impl CompositionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        self.0.set(true);
    }

    pub fn end(&self) {
        self.0.set(false);
    }

    pub fn is_active(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus {
    Outside,
    Overlapping,
    Inside,
}

type ChangeHook = Box<dyn FnMut(Option<&InlineRange>)>;
type OverlapHook = Box<dyn FnMut(&LiveSelection)>;
type RelevanceHook = Box<dyn Fn(&Document, &LiveSelection) -> bool>;

/// Callbacks a bridge reports through. Only the change hook is required.
pub struct BridgeHooks {
    on_selection_change: ChangeHook,
    on_partial_overlap: Option<OverlapHook>,
    is_relevant: Option<RelevanceHook>,
}

impl BridgeHooks {
    pub fn new(on_selection_change: impl FnMut(Option<&InlineRange>) + 'static) -> Self {
        Self {
            on_selection_change: Box::new(on_selection_change),
            on_partial_overlap: None,
            is_relevant: None,
        }
    }

    /// Receive selections with exactly one end inside the region
    pub fn on_partial_overlap(mut self, hook: impl FnMut(&LiveSelection) + 'static) -> Self {
        self.on_partial_overlap = Some(Box::new(hook));
        self
    }

    /// Filter inside selections; rejected ones are treated as outside
    pub fn is_relevant(mut self, hook: impl Fn(&Document, &LiveSelection) -> bool + 'static) -> Self {
        self.is_relevant = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for BridgeHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeHooks")
            .field("on_partial_overlap", &self.on_partial_overlap.is_some())
            .field("is_relevant", &self.is_relevant.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct SelectionBridge {
    host: NodeId,
    composition: CompositionSession,
    hooks: BridgeHooks,
    /// `None` until the first report; `Some(None)` after reporting "outside"
    last_reported: Option<Option<InlineRange>>,
}

impl SelectionBridge {
    pub fn new(host: NodeId, composition: CompositionSession, hooks: BridgeHooks) -> Self {
        Self {
            host,
            composition,
            hooks,
            last_reported: None,
        }
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    /// The range most recently reported upward
    pub fn last_range(&self) -> Option<&InlineRange> {
        self.last_reported.as_ref().and_then(Option::as_ref)
    }

    /// Classify the live selection against the managed region
    pub fn status(&self, doc: &Document) -> SelectionStatus {
        let Some(selection) = doc.selection() else {
            return SelectionStatus::Outside;
        };

        let anchor = doc.contains(self.host, selection.anchor.node);
        let focus = doc.contains(self.host, selection.focus.node);
        match (anchor, focus) {
            (true, true) => match &self.hooks.is_relevant {
                Some(is_relevant) if !is_relevant(doc, &selection) => SelectionStatus::Outside,
                _ => SelectionStatus::Inside,
            },
            (false, false) => SelectionStatus::Outside,
            _ if self.hooks.on_partial_overlap.is_some() => SelectionStatus::Overlapping,
            _ => SelectionStatus::Outside,
        }
    }

    /// Handle one selection-change notification.
    ///
    /// Returns whether anything was reported through the change hook.
    pub fn handle_selection_change(&mut self, doc: &Document) -> Result<bool, EditError> {
        if self.composition.is_active() {
            log::trace!("selection change during composition ignored");
            return Ok(false);
        }

        match self.status(doc) {
            SelectionStatus::Inside => {
                let range = match doc.selection() {
                    Some(selection) => InlineRange::from_selection(doc, self.host, &selection)?,
                    None => None,
                };
                Ok(self.report(range))
            }
            SelectionStatus::Outside => Ok(self.report(None)),
            SelectionStatus::Overlapping => {
                if let (Some(selection), Some(hook)) =
                    (doc.selection(), self.hooks.on_partial_overlap.as_mut())
                {
                    hook(&selection);
                }
                // Whatever the hook decides, the next inside selection is news
                self.last_reported = None;
                Ok(false)
            }
        }
    }

    fn report(&mut self, range: Option<InlineRange>) -> bool {
        if let Some(last) = &self.last_reported
            && same_span(last.as_ref(), range.as_ref())
        {
            return false;
        }
        log::debug!(
            "selection now {}",
            range
                .as_ref()
                .map_or_else(|| "outside".to_string(), ToString::to_string)
        );
        (self.hooks.on_selection_change)(range.as_ref());
        self.last_reported = Some(range);
        true
    }

    /// Apply the application's range to the live selection after a render.
    ///
    /// Nothing is written when the live selection already matches. `None`
    /// clears the selection, but only when it is inside the region. Returns
    /// whether the live selection was written.
    pub fn after_render(&mut self, doc: &mut Document, range: Option<&InlineRange>) -> Result<bool, EditError> {
        match range {
            Some(range) => {
                let written = range.select_range(doc)?;
                self.last_reported = Some(Some(range.revalidate(doc)?));
                Ok(written)
            }
            None if self.status(doc) == SelectionStatus::Inside => {
                doc.clear_selection();
                self.last_reported = Some(None);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Reapply the last reported range onto freshly rendered nodes.
    ///
    /// A range whose path no longer exists is dropped.
    pub fn reapply(&mut self, doc: &mut Document) -> Result<bool, EditError> {
        let Some(last) = self.last_reported.clone() else {
            return Ok(false);
        };
        match self.after_render(doc, last.as_ref()) {
            Err(EditError::InvalidPath { path }) => {
                log::debug!("last selection at {path} no longer exists");
                self.last_reported = None;
                Ok(false)
            }
            Err(EditError::OffsetOutOfBounds { .. }) => {
                self.last_reported = None;
                Ok(false)
            }
            other => other,
        }
    }
}

/// Compare ranges by address, ignoring cached node handles
fn same_span(a: Option<&InlineRange>, b: Option<&InlineRange>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.start.path == b.start.path
                && a.start.offset == b.start.offset
                && a.end.path == b.end.path
                && a.end.offset == b.end.offset
        }
        (None, None) => true,
        _ => false,
    }
}
