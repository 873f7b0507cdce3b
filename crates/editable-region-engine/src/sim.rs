//! A scripted host surface.
//!
//! [`SimulatedHost`] plays the browser's part around a [`Controller`]: it
//! delivers intents, performs the default action whenever the controller
//! could not suppress it, reports that the edit was applied, and re-renders
//! the collaborator's model the way an application would after each event.
//! Selection changes are delivered to an optional [`SelectionBridge`].

use crate::bridge::{BridgeHooks, CompositionSession, SelectionBridge};
use crate::controller::{
    Controller, Dispatch, EditHandler, HostEvent, InputIntent, InputKind, RenderOutcome, SurfaceOptions,
};
use crate::dom::{Boundary, Document, LiveSelection, Markup, NodeId, StaticRange, byte_offset, utf16_len};
use crate::error::EditError;
use crate::range::InlineRange;
use crate::support::HostSupport;

/// Produces the region's children from the collaborator's model
pub type Renderer<H> = fn(&H) -> Vec<Markup>;

pub struct SimulatedHost<H> {
    doc: Document,
    controller: Controller<H>,
    renderer: Renderer<H>,
    composition: CompositionSession,
    bridge: Option<SelectionBridge>,
    /// Markup of the last applied render
    rendered: Option<Vec<Markup>>,
    /// Region HTML after each mutation the host made on its own
    frames: Vec<String>,
}

impl<H: EditHandler> SimulatedHost<H> {
    /// Mount a controller on a fresh document and render the initial model
    pub fn mount(
        options: &SurfaceOptions,
        support: &HostSupport,
        handler: H,
        renderer: Renderer<H>,
    ) -> Result<Self, EditError> {
        let mut doc = Document::new();
        let controller = Controller::mount(&mut doc, options, support, handler);
        let mut host = Self {
            doc,
            controller,
            renderer,
            composition: CompositionSession::new(),
            bridge: None,
            rendered: None,
            frames: Vec::new(),
        };
        host.render()?;
        Ok(host)
    }

    /// Deliver selection changes to a bridge over the region
    pub fn with_bridge(mut self, hooks: BridgeHooks) -> Self {
        self.bridge = Some(SelectionBridge::new(
            self.controller.root(),
            self.composition.clone(),
            hooks,
        ));
        self
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self) -> NodeId {
        self.controller.root()
    }

    pub fn controller(&self) -> &Controller<H> {
        &self.controller
    }

    pub fn handler(&self) -> &H {
        self.controller.handler()
    }

    pub fn composition(&self) -> &CompositionSession {
        &self.composition
    }

    pub fn bridge(&self) -> Option<&SelectionBridge> {
        self.bridge.as_ref()
    }

    pub fn text(&self) -> String {
        self.doc.text_content(self.root())
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    /// First text node in the region
    pub fn text_node(&self) -> Option<NodeId> {
        self.doc
            .children(self.root())
            .iter()
            .copied()
            .find(|&child| self.doc.is_text(child))
    }

    /// Current caret or selection as a range over the region
    pub fn selected_range(&self) -> Result<Option<InlineRange>, EditError> {
        match self.doc.selection() {
            Some(selection) => InlineRange::from_selection(&self.doc, self.root(), &selection),
            None => Ok(None),
        }
    }

    /// The user moves the selection
    pub fn select(&mut self, anchor: Boundary, focus: Boundary) -> Result<(), EditError> {
        self.doc.set_selection(LiveSelection::new(anchor, focus));
        self.deliver_selection_changes()
    }

    /// Select UTF-16 offsets in the region's text; an empty region only has
    /// the caret position at its start
    pub fn select_text(&mut self, anchor: usize, focus: usize) -> Result<(), EditError> {
        let node = self.text_node().unwrap_or(self.root());
        let length = self.doc.length(node);
        if let Some(offset) = [anchor, focus].into_iter().find(|&offset| offset > length) {
            return Err(EditError::OffsetOutOfBounds {
                node,
                offset,
                length,
            });
        }
        self.select(Boundary::new(node, anchor), Boundary::new(node, focus))
    }

    /// Force a render of the collaborator's current model
    pub fn render(&mut self) -> Result<RenderOutcome, EditError> {
        let markup = (self.renderer)(self.controller.handler());
        self.render_markup(markup)
    }

    fn render_markup(&mut self, markup: Vec<Markup>) -> Result<RenderOutcome, EditError> {
        let outcome = self.controller.render(&mut self.doc, &markup)?;
        if let RenderOutcome::Applied { caret } = &outcome {
            self.rendered = Some(markup);
            if caret.is_none()
                && let Some(bridge) = &mut self.bridge
            {
                bridge.reapply(&mut self.doc)?;
            }
        }
        self.deliver_selection_changes()?;
        Ok(outcome)
    }

    /// Re-render when the model changed, the way a reactive application would
    fn settle(&mut self) -> Result<(), EditError> {
        if self.controller.state().is_ready() {
            let markup = (self.renderer)(self.controller.handler());
            if self.rendered.as_ref() != Some(&markup) || self.controller.has_pending_caret() {
                self.render_markup(markup)?;
                return Ok(());
            }
        }
        self.deliver_selection_changes()
    }

    fn deliver_selection_changes(&mut self) -> Result<(), EditError> {
        // Hosts coalesce queued notifications into one event
        if self.doc.take_selection_changes() == 0 {
            return Ok(());
        }
        if let Some(bridge) = &mut self.bridge {
            bridge.handle_selection_change(&self.doc)?;
        }
        Ok(())
    }

    /// Deliver an intent. Unless the controller suppressed it, apply the
    /// host's default action and report it applied.
    ///
    /// Intents without a target range get one from the selection, extended
    /// over one character for collapsed deletions.
    pub fn before_input(&mut self, mut intent: InputIntent) -> Result<Dispatch, EditError> {
        if !self.controller.is_interactive() {
            return Ok(Dispatch::default());
        }
        if intent.target.is_none() {
            intent.target = Some(self.target_for(&intent.kind)?);
        }

        let dispatch = self
            .controller
            .handle(&mut self.doc, HostEvent::BeforeInput(intent.clone()))?;
        self.settle()?;
        if dispatch.default_prevented {
            return Ok(dispatch);
        }

        self.apply_default(&intent)?;
        self.deliver_selection_changes()?;
        self.input(intent.kind)?;
        Ok(dispatch)
    }

    /// The host reports it finished applying an edit
    pub fn input(&mut self, kind: InputKind) -> Result<(), EditError> {
        self.controller.handle(&mut self.doc, HostEvent::Input(kind))?;
        self.settle()
    }

    /// Run an input-method composition at the selection: each update
    /// rewrites the uncommitted text in place, then `committed` is reported
    /// at composition end.
    pub fn compose(&mut self, updates: &[&str], committed: &str) -> Result<(), EditError> {
        if !self.controller.is_interactive() {
            return Ok(());
        }

        self.composition.start();
        self.controller
            .handle(&mut self.doc, HostEvent::CompositionStart)?;
        let mut composed = self.target_for(&InputKind::InsertCompositionText)?;

        for update in updates {
            let intent = InputIntent::new(InputKind::InsertCompositionText)
                .with_data(*update)
                .with_target(composed)
                .cancelable(false);
            self.controller
                .handle(&mut self.doc, HostEvent::BeforeInput(intent))?;

            let caret = self.replace_range(composed, update)?;
            let start = caret.offset - utf16_len(update);
            composed = StaticRange::new(caret.node, start, caret.node, caret.offset);
            self.doc
                .set_selection(LiveSelection::caret(caret.node, caret.offset));
            self.frames.push(self.doc.inner_html(self.root()));
            self.deliver_selection_changes()?;

            self.controller.handle(
                &mut self.doc,
                HostEvent::Input(InputKind::InsertCompositionText),
            )?;
        }

        self.controller.handle(
            &mut self.doc,
            HostEvent::CompositionEnd {
                data: committed.to_string(),
            },
        )?;
        self.composition.end();
        self.settle()
    }

    fn target_for(&self, kind: &InputKind) -> Result<StaticRange, EditError> {
        let range = self.selected_range()?.ok_or(EditError::NoSelection)?;
        let target = range.to_static_range();
        if !target.collapsed() || !self.doc.is_text(target.start_container) {
            return Ok(target);
        }

        let node = target.start_container;
        let offset = target.start_offset;
        let text = self.doc.text(node).unwrap_or_default();
        let extended = match kind {
            InputKind::DeleteContentBackward => char_before(text, offset)
                .map(|units| StaticRange::new(node, offset - units, node, offset)),
            InputKind::DeleteContentForward => char_after(text, offset)
                .map(|units| StaticRange::new(node, offset, node, offset + units)),
            _ => None,
        };
        Ok(extended.unwrap_or(target))
    }

    fn apply_default(&mut self, intent: &InputIntent) -> Result<(), EditError> {
        let target = match intent.target {
            Some(target) => InlineRange::from_static_range(&self.doc, self.root(), &target)?.to_static_range(),
            None => return Err(EditError::NoSelection),
        };

        let caret = match &intent.kind {
            InputKind::InsertParagraph => self.break_line(target)?,
            kind if kind.is_deletion() => self.delete_range(target)?,
            _ => {
                let data = intent.data.as_deref().unwrap_or_default();
                self.replace_range(target, data)?
            }
        };
        self.doc
            .set_selection(LiveSelection::caret(caret.node, caret.offset));
        self.frames.push(self.doc.inner_html(self.root()));
        Ok(())
    }

    /// Replace the content of `target` with `data`, returning the caret after it
    fn replace_range(&mut self, target: StaticRange, data: &str) -> Result<Boundary, EditError> {
        let start = self.delete_range(target)?;
        if data.is_empty() {
            return Ok(start);
        }
        let (node, offset) = self.text_at(start)?;
        self.doc.insert_data(node, offset, data)?;
        Ok(Boundary::new(node, offset + utf16_len(data)))
    }

    /// Remove the content of `target`, returning where it collapsed to
    fn delete_range(&mut self, target: StaticRange) -> Result<Boundary, EditError> {
        let StaticRange {
            start_container: start,
            start_offset,
            end_container: end,
            end_offset,
        } = target;
        let collapsed = Boundary::new(start, start_offset);

        if start == end {
            if self.doc.is_text(start) {
                if end_offset > start_offset {
                    self.doc
                        .delete_data(start, start_offset, end_offset - start_offset)?;
                }
            } else {
                for index in (start_offset..end_offset).rev() {
                    let child = self.doc.children(start)[index];
                    self.doc.remove_child(start, child)?;
                }
            }
            return Ok(collapsed);
        }

        // Sibling text nodes: trim both ends and drop whatever lies between
        if let Some(parent) = self.doc.parent(start)
            && self.doc.parent(end) == Some(parent)
            && self.doc.is_text(start)
            && self.doc.is_text(end)
        {
            let first = self.doc.child_index(parent, start);
            let last = self.doc.child_index(parent, end);
            if let (Some(first), Some(last)) = (first, last) {
                let between: Vec<NodeId> = self.doc.children(parent)[first + 1..last].to_vec();
                for node in between {
                    self.doc.remove_child(parent, node)?;
                }
            }
            let tail = self.doc.length(start) - start_offset;
            self.doc.delete_data(start, start_offset, tail)?;
            self.doc.delete_data(end, 0, end_offset)?;
            return Ok(collapsed);
        }

        log::warn!("default action over {target:?} is not simulated");
        Ok(collapsed)
    }

    /// Text node to type into at `at`, creating one in an element when needed
    fn text_at(&mut self, at: Boundary) -> Result<(NodeId, usize), EditError> {
        if self.doc.is_text(at.node) {
            return Ok((at.node, at.offset));
        }

        let children = self.doc.children(at.node);
        if let Some(&before) = at.offset.checked_sub(1).and_then(|i| children.get(i))
            && self.doc.is_text(before)
        {
            return Ok((before, self.doc.length(before)));
        }
        let reference = children.get(at.offset).copied();
        if let Some(after) = reference
            && self.doc.is_text(after)
        {
            return Ok((after, 0));
        }

        let node = self.doc.create_text("");
        self.doc.insert_before(at.node, node, reference)?;
        Ok((node, 0))
    }

    /// Split the text at `target` around a `<br>`
    fn break_line(&mut self, target: StaticRange) -> Result<Boundary, EditError> {
        let at = self.delete_range(target)?;
        let line_break = self.doc.create_element("br");

        if !self.doc.is_text(at.node) {
            let reference = self.doc.children(at.node).get(at.offset).copied();
            self.doc.insert_before(at.node, line_break, reference)?;
            return Ok(Boundary::new(at.node, at.offset + 1));
        }

        let parent = self.doc.parent(at.node).ok_or(EditError::NotInRoot)?;
        let text = self.doc.text(at.node).unwrap_or_default();
        let split = byte_offset(text, at.offset).ok_or(EditError::OffsetOutOfBounds {
            node: at.node,
            offset: at.offset,
            length: utf16_len(text),
        })?;
        let tail_text = text[split..].to_string();

        let index = self
            .doc
            .child_index(parent, at.node)
            .ok_or(EditError::NotInRoot)?;
        let reference = self.doc.children(parent).get(index + 1).copied();
        let tail_length = self.doc.length(at.node) - at.offset;
        self.doc.delete_data(at.node, at.offset, tail_length)?;
        self.doc.insert_before(parent, line_break, reference)?;
        let tail = self.doc.create_text(tail_text);
        self.doc.insert_before(parent, tail, reference)?;
        Ok(Boundary::new(tail, 0))
    }
}

/// UTF-16 length of the character ending at `offset`
fn char_before(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for ch in text.chars() {
        let next = units + ch.len_utf16();
        if next == offset {
            return Some(ch.len_utf16());
        }
        if next > offset {
            return None;
        }
        units = next;
    }
    None
}

/// UTF-16 length of the character starting at `offset`
fn char_after(text: &str, offset: usize) -> Option<usize> {
    let mut units = 0;
    for ch in text.chars() {
        if units == offset {
            return Some(ch.len_utf16());
        }
        units += ch.len_utf16();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plain_text::PlainText;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn plain(text: &str) -> SimulatedHost<PlainText> {
        SimulatedHost::mount(
            &SurfaceOptions::default(),
            &HostSupport::assume_supported(),
            PlainText::new(text),
            PlainText::markup,
        )
        .unwrap()
    }

    #[rstest]
    #[case("a😀b", 3, Some(2))]
    #[case("ab", 1, Some(1))]
    #[case("ab", 0, None)]
    #[case("a😀b", 2, None)]
    fn test_char_before(#[case] text: &str, #[case] offset: usize, #[case] expected: Option<usize>) {
        assert_eq!(char_before(text, offset), expected);
    }

    #[rstest]
    #[case("a😀b", 1, Some(2))]
    #[case("ab", 2, None)]
    fn test_char_after(#[case] text: &str, #[case] offset: usize, #[case] expected: Option<usize>) {
        assert_eq!(char_after(text, offset), expected);
    }

    #[test]
    fn test_backspace_targets_previous_character() {
        let mut host = plain("a😀b");
        host.select_text(3, 3).unwrap();

        host.before_input(InputIntent::new(InputKind::DeleteContentBackward))
            .unwrap();

        assert_eq!(host.text(), "ab");
        assert_eq!(host.handler().text(), "ab");
        let caret = host.selected_range().unwrap().unwrap();
        assert_eq!(caret.start.offset, 1);
    }

    #[test]
    fn test_uncontrolled_paragraph_is_rolled_back() {
        let mut host = plain("ab");
        host.select_text(1, 1).unwrap();

        host.before_input(InputIntent::new(InputKind::InsertParagraph).cancelable(false))
            .unwrap();

        assert_eq!(host.frames(), &["a<br>b".to_string()]);
        insta::assert_snapshot!(host.doc().outer_html(host.root()), @r#"<p contenteditable="true">ab</p>"#);
        assert!(host.handler().calls().is_empty());
    }

    #[test]
    fn test_typing_into_empty_region() {
        let mut host = plain("");
        host.select_text(0, 0).unwrap();

        host.before_input(InputIntent::new(InputKind::InsertText).with_data("hi").cancelable(false))
            .unwrap();

        assert_eq!(host.frames(), &["hi".to_string()]);
        assert_eq!(host.text(), "hi");
        assert_eq!(host.selected_range().unwrap().unwrap().start.offset, 2);
    }

    #[test]
    fn test_select_text_checks_bounds() {
        let mut host = plain("ab");

        assert!(matches!(
            host.select_text(0, 3),
            Err(EditError::OffsetOutOfBounds { offset: 3, .. })
        ));
    }
}
