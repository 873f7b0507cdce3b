//! Mutation records queued for observers of a subtree.
//!
//! Records are queued in the order the host applied them and stay "pending"
//! until their observer collects them, the same way an asynchronous observer
//! can still hold undelivered records when a caller asks for them.

use super::NodeId;

/// Handle returned by [`super::Document::observe`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

/// What changed on the record's target
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationKind {
    /// Text content of a text node changed; `old_value` is the content before
    CharacterData { old_value: String },
    /// Children were inserted into or removed from the target
    ChildList {
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    /// Document-wide ordering index, strictly increasing in application order
    pub sequence: u64,
    pub target: NodeId,
    pub kind: MutationKind,
}

impl MutationRecord {
    pub fn is_character_data(&self) -> bool {
        matches!(self.kind, MutationKind::CharacterData { .. })
    }
}

#[derive(Debug)]
struct Registration {
    id: ObserverId,
    root: NodeId,
    pending: Vec<MutationRecord>,
}

/// Observer registry owned by a document
#[derive(Debug, Default)]
pub(crate) struct Observers {
    registrations: Vec<Registration>,
    next_id: u64,
    next_sequence: u64,
}

impl Observers {
    pub(crate) fn register(&mut self, root: NodeId) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration {
            id,
            root,
            pending: Vec::new(),
        });
        id
    }

    pub(crate) fn disconnect(&mut self, id: ObserverId) {
        self.registrations.retain(|registration| registration.id != id);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub(crate) fn roots(&self) -> impl Iterator<Item = (ObserverId, NodeId)> + '_ {
        self.registrations
            .iter()
            .map(|registration| (registration.id, registration.root))
    }

    /// Queue one record for every interested observer
    pub(crate) fn queue(&mut self, interested: &[ObserverId], target: NodeId, kind: MutationKind) {
        if interested.is_empty() {
            return;
        }
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        for registration in &mut self.registrations {
            if interested.contains(&registration.id) {
                registration.pending.push(MutationRecord {
                    sequence,
                    target,
                    kind: kind.clone(),
                });
            }
        }
    }

    pub(crate) fn take(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.registrations
            .iter_mut()
            .find(|registration| registration.id == id)
            .map(|registration| std::mem::take(&mut registration.pending))
            .unwrap_or_default()
    }
}
