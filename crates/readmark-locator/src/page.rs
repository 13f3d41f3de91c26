//! In-process page model for hosts that drive highlighting directly.
//!
//! Mirrors what the injected page script keeps: the rendered text nodes in
//! document order and the set of currently wrapped spans. Hosts that proxy
//! to a real page keep equivalent state on the page side.

use crate::locate::{HighlightSpan, Locator};

pub struct PageModel {
    nodes: Vec<String>,
    highlights: Vec<HighlightSpan>,
}

impl PageModel {
    /// Build a model from text nodes in document order. Callers exclude
    /// nodes under script/style or non-rendered elements.
    pub fn new(nodes: Vec<String>) -> Self {
        Self {
            nodes,
            highlights: Vec::new(),
        }
    }

    /// Locate and wrap a quotation. Any spans from a prior call are removed
    /// first, so repeated calls with the same input converge. Returns
    /// whether anything matched.
    pub fn apply(&mut self, locator: &Locator, verbatim: &str) -> bool {
        self.highlights.clear();
        self.highlights = locator.find(&self.nodes, verbatim);
        !self.highlights.is_empty()
    }

    pub fn highlights(&self) -> &[HighlightSpan] {
        &self.highlights
    }

    /// Node index of the first wrapped span, the scroll target.
    pub fn scroll_target(&self) -> Option<usize> {
        self.highlights.first().map(|span| span.node_index)
    }
}
