use editable_region_engine::{Document, Markup, NodeId};

// Benchmark helpers - only some benchmark files use each of them
#[allow(dead_code)]
pub fn nested_region(depth: usize, fanout: usize) -> (Document, NodeId) {
    let mut doc = Document::new();
    let host = doc.build(&Markup::element("p", nested_children(depth, fanout)));
    (doc, host)
}

fn nested_children(depth: usize, fanout: usize) -> Vec<Markup> {
    if depth == 0 {
        return vec![Markup::text("lorem ipsum dolor sit amet")];
    }
    (0..fanout)
        .map(|_| Markup::element("span", nested_children(depth - 1, fanout)))
        .collect()
}

/// The last leaf in document order
#[allow(dead_code)]
pub fn deepest_leaf(doc: &Document, host: NodeId) -> NodeId {
    let mut node = host;
    while let Some(&last) = doc.children(node).last() {
        node = last;
    }
    node
}
