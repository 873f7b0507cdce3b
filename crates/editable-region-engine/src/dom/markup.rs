use std::collections::BTreeMap;

/// Child content a collaborator asks the editable surface to display.
///
/// The surface is a pure reflection of this value; it never feeds back into
/// the collaborator's text model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Markup {
    Text(String),
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<Markup>,
    },
}

impl Markup {
    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    pub fn element(tag: impl Into<String>, children: Vec<Markup>) -> Self {
        Markup::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children,
        }
    }

    /// Add an attribute; no-op on text markup
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Markup::Element { attributes, .. } = &mut self {
            attributes.insert(name.into(), value.into());
        }
        self
    }
}
