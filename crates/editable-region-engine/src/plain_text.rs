//! A single-string text model driven by an editable region.
//!
//! The region renders as one text node (or nothing when the text is empty),
//! so every collaborator range maps onto character positions in the buffer.

use serde::Serialize;
use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::addressing::Path;
use crate::controller::{CaretFixer, EditHandler};
use crate::dom::Markup;
use crate::range::{InlineRange, Point};

/// A collaborator call as the model received it, in UTF-16 offsets
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PlainTextCall {
    InsertText { start: usize, end: usize, text: String },
    DeleteContent { start: usize, end: usize },
}

impl std::fmt::Display for PlainTextCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlainTextCall::InsertText { start, end, text } => {
                write!(f, "insert_text([{start}, {end}], {text:?})")
            }
            PlainTextCall::DeleteContent { start, end } => {
                write!(f, "delete_content([{start}, {end}])")
            }
        }
    }
}

#[derive(Debug)]
pub struct PlainText {
    text: Rope,
    calls: Vec<PlainTextCall>,
}

impl PlainText {
    pub fn new(text: &str) -> Self {
        Self {
            text: Rope::from(text),
            calls: Vec::new(),
        }
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn calls(&self) -> &[PlainTextCall] {
        &self.calls
    }

    /// Children to render into the region
    pub fn markup(&self) -> Vec<Markup> {
        if self.text.len() == 0 {
            Vec::new()
        } else {
            vec![Markup::text(self.text())]
        }
    }

    /// Character position of `point` in the buffer
    fn position(&self, text: &str, point: &Point) -> usize {
        let chars = text.chars().count();
        if point.path.is_empty() {
            // Element boundary in the region itself: before or after the text node
            if point.offset == 0 { 0 } else { chars }
        } else {
            point.code_point_offset.min(chars)
        }
    }

    /// Replace `range` with `replacement`, returning the UTF-16 caret after it
    fn splice(&mut self, range: &InlineRange, replacement: &str) -> (usize, usize, usize) {
        let text = self.text();
        let start = self.position(&text, &range.start);
        let end = self.position(&text, &range.end).max(start);

        let mut builder = Builder::new(self.text.len());
        builder.replace(
            byte_at(&text, start)..byte_at(&text, end),
            Rope::from(replacement),
        );
        self.text = builder.build().apply(&self.text);

        let caret = utf16_at(&text, start) + crate::dom::utf16_len(replacement);
        (utf16_at(&text, start), utf16_at(&text, end), caret)
    }

    fn place_caret(&self, caret: &mut CaretFixer, offset: usize) {
        if self.text.len() == 0 {
            caret.fix_caret(|doc, host| InlineRange::caret(doc, host, Path::root(), 0));
        } else {
            caret.fix_caret(move |doc, host| InlineRange::caret(doc, host, Path::from([0]), offset));
        }
    }
}

impl Default for PlainText {
    fn default() -> Self {
        Self::new("")
    }
}

impl EditHandler for PlainText {
    fn insert_text(&mut self, range: &InlineRange, text: &str, caret: &mut CaretFixer) {
        let (start, end, offset) = self.splice(range, text);
        self.calls.push(PlainTextCall::InsertText {
            start,
            end,
            text: text.to_string(),
        });
        self.place_caret(caret, offset);
    }

    fn delete_content(&mut self, range: &InlineRange, caret: &mut CaretFixer) {
        let (start, end, offset) = self.splice(range, "");
        self.calls.push(PlainTextCall::DeleteContent { start, end });
        self.place_caret(caret, offset);
    }
}

fn byte_at(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}

fn utf16_at(text: &str, chars: usize) -> usize {
    text.chars().take(chars).map(char::len_utf16).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn region(text: &str) -> (Document, NodeId) {
        let mut doc = Document::new();
        let host = doc.build(&Markup::element("p", vec![Markup::text(text)]));
        (doc, host)
    }

    fn span(doc: &Document, host: NodeId, start: usize, end: usize) -> InlineRange {
        InlineRange::from_paths(doc, host, Path::from([0]), start, Path::from([0]), end).unwrap()
    }

    /// Render the model and run the caret thunk against the fresh nodes
    fn rendered_caret(model: &PlainText, fixer: &mut CaretFixer) -> InlineRange {
        let mut doc = Document::new();
        let host = doc.create_element("p");
        doc.replace_children(host, &model.markup()).unwrap();
        let thunk = fixer.take().expect("caret thunk registered");
        thunk(&doc, host).unwrap()
    }

    #[rstest]
    #[case("cat", 3, 3, "s", "cats", 4)]
    #[case("ab", 1, 1, "に", "aにb", 2)]
    #[case("hello", 0, 5, "bye", "bye", 3)]
    #[case("a😀b", 3, 3, "c", "a😀cb", 4)]
    fn test_insert_text(
        #[case] initial: &str,
        #[case] start: usize,
        #[case] end: usize,
        #[case] inserted: &str,
        #[case] expected: &str,
        #[case] expected_caret: usize,
    ) {
        let (doc, host) = region(initial);
        let mut model = PlainText::new(initial);
        let mut fixer = CaretFixer::new();

        model.insert_text(&span(&doc, host, start, end), inserted, &mut fixer);

        assert_eq!(model.text(), expected);
        let caret = rendered_caret(&model, &mut fixer);
        assert!(caret.is_collapsed());
        assert_eq!(caret.start.offset, expected_caret);
    }

    #[test]
    fn test_delete_content() {
        let (doc, host) = region("cats");
        let mut model = PlainText::new("cats");
        let mut fixer = CaretFixer::new();

        model.delete_content(&span(&doc, host, 3, 4), &mut fixer);

        assert_eq!(model.text(), "cat");
        assert_eq!(
            model.calls(),
            &[PlainTextCall::DeleteContent { start: 3, end: 4 }]
        );
        assert_eq!(rendered_caret(&model, &mut fixer).start.offset, 3);
    }

    #[test]
    fn test_deleting_everything_puts_caret_in_region() {
        let (doc, host) = region("ab");
        let mut model = PlainText::new("ab");
        let mut fixer = CaretFixer::new();

        model.delete_content(&span(&doc, host, 0, 2), &mut fixer);

        assert!(model.markup().is_empty());
        let caret = rendered_caret(&model, &mut fixer);
        assert_eq!(caret.start.path, Path::root());
        assert_eq!(caret.start.offset, 0);
    }

    #[test]
    fn test_insert_into_empty_region() {
        let mut doc = Document::new();
        let host = doc.create_element("p");
        let mut model = PlainText::default();
        let mut fixer = CaretFixer::new();

        let range = InlineRange::caret(&doc, host, Path::root(), 0).unwrap();
        model.insert_text(&range, "hi", &mut fixer);

        assert_eq!(model.text(), "hi");
        assert_eq!(rendered_caret(&model, &mut fixer).start.offset, 2);
    }

    #[test]
    fn test_call_log_display() {
        let (doc, host) = region("ab");
        let mut model = PlainText::new("ab");
        let mut fixer = CaretFixer::new();

        model.insert_text(&span(&doc, host, 1, 1), "x", &mut fixer);

        let calls: Vec<String> = model.calls().iter().map(ToString::to_string).collect();
        assert_eq!(calls, vec![r#"insert_text([1, 1], "x")"#.to_string()]);
    }
}
