use serde::{Deserialize, Serialize};

use crate::dom::StaticRange;

/// Host input type of an editing intent.
///
/// Names follow the host's `inputType` strings; anything unrecognised is kept
/// verbatim so it can still be logged and rolled back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InputKind {
    InsertText,
    InsertParagraph,
    InsertCompositionText,
    InsertFromComposition,
    DeleteContent,
    DeleteContentBackward,
    DeleteContentForward,
    Other(String),
}

impl InputKind {
    pub fn as_str(&self) -> &str {
        match self {
            InputKind::InsertText => "insertText",
            InputKind::InsertParagraph => "insertParagraph",
            InputKind::InsertCompositionText => "insertCompositionText",
            InputKind::InsertFromComposition => "insertFromComposition",
            InputKind::DeleteContent => "deleteContent",
            InputKind::DeleteContentBackward => "deleteContentBackward",
            InputKind::DeleteContentForward => "deleteContentForward",
            InputKind::Other(name) => name,
        }
    }

    pub fn is_deletion(&self) -> bool {
        matches!(
            self,
            InputKind::DeleteContent
                | InputKind::DeleteContentBackward
                | InputKind::DeleteContentForward
        )
    }
}

impl From<&str> for InputKind {
    fn from(name: &str) -> Self {
        match name {
            "insertText" => InputKind::InsertText,
            "insertParagraph" => InputKind::InsertParagraph,
            "insertCompositionText" => InputKind::InsertCompositionText,
            "insertFromComposition" => InputKind::InsertFromComposition,
            "deleteContent" => InputKind::DeleteContent,
            "deleteContentBackward" => InputKind::DeleteContentBackward,
            "deleteContentForward" => InputKind::DeleteContentForward,
            other => InputKind::Other(other.to_string()),
        }
    }
}

impl From<String> for InputKind {
    fn from(name: String) -> Self {
        InputKind::from(name.as_str())
    }
}

impl From<InputKind> for String {
    fn from(kind: InputKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A host-delivered editing intent, seen before the host applies it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputIntent {
    pub kind: InputKind,
    pub data: Option<String>,
    /// Where the edit applies; falls back to the live selection when absent
    pub target: Option<StaticRange>,
    /// Opaque host policy: whether suppressing the intent stops the host
    /// from mutating the tree
    pub cancelable: bool,
}

impl InputIntent {
    pub fn new(kind: InputKind) -> Self {
        Self {
            kind,
            data: None,
            target: None,
            cancelable: true,
        }
    }

    pub fn insert_text(text: impl Into<String>, target: StaticRange) -> Self {
        Self::new(InputKind::InsertText)
            .with_data(text)
            .with_target(target)
    }

    pub fn delete(kind: InputKind, target: StaticRange) -> Self {
        Self::new(kind).with_target(target)
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_target(mut self, target: StaticRange) -> Self {
        self.target = Some(target);
        self
    }

    pub fn cancelable(mut self, cancelable: bool) -> Self {
        self.cancelable = cancelable;
        self
    }
}

/// Notifications the host delivers to the controller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    /// An edit is about to happen
    BeforeInput(InputIntent),
    /// The host finished applying an edit of this kind
    Input(InputKind),
    CompositionStart,
    /// Composition committed `data` (empty when cancelled)
    CompositionEnd { data: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("insertText", InputKind::InsertText)]
    #[case("insertParagraph", InputKind::InsertParagraph)]
    #[case("insertCompositionText", InputKind::InsertCompositionText)]
    #[case("insertFromComposition", InputKind::InsertFromComposition)]
    #[case("deleteContent", InputKind::DeleteContent)]
    #[case("deleteContentBackward", InputKind::DeleteContentBackward)]
    #[case("deleteContentForward", InputKind::DeleteContentForward)]
    #[case("formatBold", InputKind::Other("formatBold".to_string()))]
    fn test_input_kind_names(#[case] name: &str, #[case] kind: InputKind) {
        assert_eq!(InputKind::from(name), kind);
        assert_eq!(kind.as_str(), name);
    }

    #[test]
    fn test_deletion_kinds() {
        assert!(InputKind::DeleteContentBackward.is_deletion());
        assert!(!InputKind::InsertText.is_deletion());
        assert!(!InputKind::Other("deleteByCut".to_string()).is_deletion());
    }
}
