//! The match ladder: single node, boundary words, sentence fragments.

use tracing::debug;

use readmark_config::HighlightConfig;

use crate::text::Normalized;

/// A byte range to wrap inside one text node. Offsets are into the node's
/// raw (un-normalized) text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightSpan {
    pub node_index: usize,
    pub start: usize,
    pub end: usize,
}

struct NodeText {
    raw_len: usize,
    exact: Normalized,
    folded: Normalized,
}

/// Plans highlight spans for a quotation over a page's text nodes.
pub struct Locator {
    config: HighlightConfig,
}

impl Locator {
    pub fn new(config: HighlightConfig) -> Self {
        Self { config }
    }

    /// Find the quotation, trying each ladder stage in order. Returns the
    /// spans to wrap, empty when nothing matched. An empty or
    /// whitespace-only quotation never matches.
    pub fn find(&self, nodes: &[String], verbatim: &str) -> Vec<HighlightSpan> {
        let needle = Normalized::new(verbatim, false).text;
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_folded = Normalized::new(verbatim, true).text;
        let nodes: Vec<NodeText> = nodes
            .iter()
            .map(|raw| NodeText {
                raw_len: raw.len(),
                exact: Normalized::new(raw, false),
                folded: Normalized::new(raw, true),
            })
            .collect();

        if let Some(span) = single_node(&nodes, &needle, &needle_folded) {
            debug!("Quotation matched whole in node {}", span.node_index);
            return vec![span];
        }
        if let Some(spans) = self.boundary_words(&nodes, &needle, &needle_folded) {
            debug!("Quotation matched via boundary words, {} span(s)", spans.len());
            return spans;
        }
        let spans = self.sentence_fragments(&nodes, &needle);
        if !spans.is_empty() {
            debug!("Quotation matched via fragments, {} span(s)", spans.len());
        }
        spans
    }

    /// Stage 2: anchor the first and last `k` words, scan nodes in order for
    /// the start anchor and a bounded window forward for the end anchor.
    fn boundary_words(
        &self,
        nodes: &[NodeText],
        needle: &str,
        needle_folded: &str,
    ) -> Option<Vec<HighlightSpan>> {
        let word_count = needle.split(' ').count();
        if word_count < 2 {
            return None;
        }
        // Short quotations get shorter anchors so start and end never overlap.
        let k0 = self.config.anchor_words.min(word_count / 2).max(1);
        let mut widths = vec![k0];
        if k0 >= 3 {
            widths.push(2);
        }

        for k in widths {
            for (rep, pick) in [
                (needle, pick_exact as fn(&NodeText) -> &Normalized),
                (needle_folded, pick_folded as fn(&NodeText) -> &Normalized),
            ] {
                let words: Vec<&str> = rep.split(' ').collect();
                let start_anchor = words[..k].join(" ");
                let end_anchor = words[words.len() - k..].join(" ");
                if let Some(spans) = self.scan_anchors(nodes, &start_anchor, &end_anchor, pick) {
                    return Some(spans);
                }
            }
        }
        None
    }

    fn scan_anchors(
        &self,
        nodes: &[NodeText],
        start_anchor: &str,
        end_anchor: &str,
        pick: fn(&NodeText) -> &Normalized,
    ) -> Option<Vec<HighlightSpan>> {
        for i in 0..nodes.len() {
            let start_text = pick(&nodes[i]);
            let Some(s_pos) = start_text.text.find(start_anchor) else {
                continue;
            };

            // Both anchors in one node degenerates to a single span.
            if let Some(rel) = start_text.text[s_pos..].find(end_anchor) {
                let e_end = s_pos + rel + end_anchor.len();
                let (raw_start, raw_end) = start_text.raw_span(s_pos, e_end);
                return Some(vec![HighlightSpan {
                    node_index: i,
                    start: raw_start,
                    end: raw_end,
                }]);
            }

            let window_end = (i + self.config.node_window).min(nodes.len().saturating_sub(1));
            for j in (i + 1)..=window_end {
                let end_text = pick(&nodes[j]);
                let Some(e_pos) = end_text.text.find(end_anchor) else {
                    continue;
                };

                let mut spans = Vec::with_capacity(j - i + 1);
                let (raw_start, _) =
                    start_text.raw_span(s_pos, s_pos + start_anchor.len());
                spans.push(HighlightSpan {
                    node_index: i,
                    start: raw_start,
                    end: nodes[i].raw_len,
                });
                for mid in (i + 1)..j {
                    if nodes[mid].raw_len == 0 {
                        continue;
                    }
                    spans.push(HighlightSpan {
                        node_index: mid,
                        start: 0,
                        end: nodes[mid].raw_len,
                    });
                }
                let (_, raw_end) = end_text.raw_span(e_pos, e_pos + end_anchor.len());
                spans.push(HighlightSpan {
                    node_index: j,
                    start: 0,
                    end: raw_end,
                });
                return Some(spans);
            }
        }
        None
    }

    /// Stage 3: split on sentence terminators and match each sufficiently
    /// long fragment independently, one span per matched fragment.
    fn sentence_fragments(&self, nodes: &[NodeText], needle: &str) -> Vec<HighlightSpan> {
        let mut spans = Vec::new();
        for fragment in needle.split(['.', '!', '?']) {
            let fragment = fragment.trim();
            let words = fragment.split(' ').filter(|w| !w.is_empty()).count();
            if words < self.config.min_fragment_words {
                continue;
            }
            let folded = fragment.to_lowercase();
            if let Some(span) = single_node(nodes, fragment, &folded) {
                spans.push(span);
            }
        }
        spans
    }
}

/// Stage 1: the whole needle inside one node, exact then case-insensitive.
fn single_node(nodes: &[NodeText], needle: &str, needle_folded: &str) -> Option<HighlightSpan> {
    for (i, node) in nodes.iter().enumerate() {
        if let Some(pos) = node.exact.text.find(needle) {
            let (start, end) = node.exact.raw_span(pos, pos + needle.len());
            return Some(HighlightSpan {
                node_index: i,
                start,
                end,
            });
        }
        if let Some(pos) = node.folded.text.find(needle_folded) {
            let (start, end) = node.folded.raw_span(pos, pos + needle_folded.len());
            return Some(HighlightSpan {
                node_index: i,
                start,
                end,
            });
        }
    }
    None
}

fn pick_exact(node: &NodeText) -> &Normalized {
    &node.exact
}

fn pick_folded(node: &NodeText) -> &Normalized {
    &node.folded
}

#[cfg(test)]
#[path = "locate_tests.rs"]
mod tests;
