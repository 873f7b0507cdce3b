//! Mutation capture and rollback.
//!
//! While armed, every change the host makes under the editable root is
//! buffered. [`MutationCapture::restore`] undoes the buffered changes newest
//! first and puts the selection back where it was when capture was armed.

use crate::dom::{Document, MutationKind, MutationRecord, NodeId, ObserverId};
use crate::error::EditError;
use crate::range::InlineRange;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Observing {
        observer: ObserverId,
        root: NodeId,
        /// Selection inside the root when capture was armed
        saved_range: Option<InlineRange>,
    },
}

#[derive(Debug)]
pub struct MutationCapture {
    state: CaptureState,
    buffer: Vec<MutationRecord>,
}

impl Default for MutationCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationCapture {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            buffer: Vec::new(),
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn is_observing(&self) -> bool {
        matches!(self.state, CaptureState::Observing { .. })
    }

    pub fn saved_range(&self) -> Option<&InlineRange> {
        match &self.state {
            CaptureState::Observing { saved_range, .. } => saved_range.as_ref(),
            CaptureState::Idle => None,
        }
    }

    /// Records delivered so far in this cycle
    pub fn buffered(&self) -> &[MutationRecord] {
        &self.buffer
    }

    /// Idle → Observing. Snapshots the current selection as the pre-mutation range.
    pub fn attach(&mut self, doc: &mut Document, root: NodeId) -> Result<(), EditError> {
        if self.is_observing() {
            return Err(EditError::CaptureArmed);
        }

        let saved_range = match doc.selection() {
            Some(selection) => InlineRange::from_selection(doc, root, &selection)?,
            None => None,
        };
        self.buffer.clear();
        let observer = doc.observe(root);
        log::debug!(
            "capture armed on {root:?}, saved range {}",
            saved_range
                .as_ref()
                .map_or_else(|| "none".to_string(), ToString::to_string)
        );
        self.state = CaptureState::Observing {
            observer,
            root,
            saved_range,
        };
        Ok(())
    }

    /// Move records the host has queued into the buffer
    pub fn collect(&mut self, doc: &mut Document) {
        if let CaptureState::Observing { observer, .. } = self.state {
            self.buffer.extend(doc.take_records(observer));
        }
    }

    /// Observing → Idle, dropping buffered records without reversing them
    pub fn detach(&mut self, doc: &mut Document) {
        if let CaptureState::Observing { observer, .. } = self.state {
            doc.disconnect(observer);
        }
        self.buffer.clear();
        self.state = CaptureState::Idle;
    }

    /// Observing → Idle, undoing every buffered and undelivered record in
    /// reverse order and reselecting the pre-mutation range.
    ///
    /// Returns the pre-mutation range. Restoring while idle is a no-op.
    pub fn restore(&mut self, doc: &mut Document) -> Result<Option<InlineRange>, EditError> {
        let CaptureState::Observing {
            observer,
            saved_range,
            ..
        } = std::mem::replace(&mut self.state, CaptureState::Idle)
        else {
            return Ok(None);
        };

        let mut records = std::mem::take(&mut self.buffer);
        records.extend(doc.take_records(observer));
        doc.disconnect(observer);

        log::debug!("rolling back {} mutation(s)", records.len());
        revert(doc, &records)?;

        let Some(range) = saved_range else {
            return Ok(None);
        };
        let range = range.revalidate(doc)?;
        range.select_range(doc)?;
        Ok(Some(range))
    }
}

/// Undo `records`, which must be in the order the host applied them
pub fn revert(doc: &mut Document, records: &[MutationRecord]) -> Result<(), EditError> {
    for record in records.iter().rev() {
        log::trace!("reverting #{} on {:?}", record.sequence, record.target);
        match &record.kind {
            MutationKind::CharacterData { old_value } => {
                doc.set_text(record.target, old_value)?;
            }
            MutationKind::ChildList {
                added,
                removed,
                next_sibling,
                ..
            } => {
                for &node in added {
                    doc.remove_child(record.target, node)?;
                }
                for &node in removed {
                    doc.insert_before(record.target, node, *next_sibling)?;
                }
            }
        }
    }
    Ok(())
}
