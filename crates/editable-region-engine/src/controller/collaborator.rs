//! The contract between the controller and the application that owns the
//! text model.

use crate::dom::{Document, NodeId};
use crate::error::EditError;
use crate::range::InlineRange;

/// Deferred caret placement, evaluated once the region has re-rendered
pub type CaretThunk = Box<dyn FnOnce(&Document, NodeId) -> Result<InlineRange, EditError>>;

/// Slot a collaborator uses to register where the caret should land after
/// the next render. The new nodes do not exist yet when the callback runs,
/// so a collaborator registers a computation rather than a range.
#[derive(Default)]
pub struct CaretFixer {
    thunk: Option<CaretThunk>,
}

impl CaretFixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the caret computation
    pub fn fix_caret(
        &mut self,
        thunk: impl FnOnce(&Document, NodeId) -> Result<InlineRange, EditError> + 'static,
    ) {
        self.thunk = Some(Box::new(thunk));
    }

    pub fn is_pending(&self) -> bool {
        self.thunk.is_some()
    }

    pub(crate) fn take(&mut self) -> Option<CaretThunk> {
        self.thunk.take()
    }
}

impl std::fmt::Debug for CaretFixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaretFixer")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// Whether paragraph intents reach the collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParagraphPolicy {
    /// Swallow paragraph intents
    #[default]
    Reject,
    Forward,
}

/// Application side of an editable region.
///
/// Ranges passed in are only valid for the duration of the call: their node
/// handles go stale as soon as the model changes and the region re-renders.
pub trait EditHandler {
    /// Splice `text` over `range`
    fn insert_text(&mut self, range: &InlineRange, text: &str, caret: &mut CaretFixer);

    /// Remove the content spanned by `range`
    fn delete_content(&mut self, range: &InlineRange, caret: &mut CaretFixer);

    /// Only called when [`EditHandler::paragraph_policy`] is `Forward`
    fn insert_paragraph(&mut self, _range: &InlineRange, _caret: &mut CaretFixer) {}

    /// Read once when the controller is mounted
    fn paragraph_policy(&self) -> ParagraphPolicy {
        ParagraphPolicy::Reject
    }
}
