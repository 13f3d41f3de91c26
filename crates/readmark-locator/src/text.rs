//! Text normalization with raw-offset mapping.
//!
//! Quotations arrive with typographic quotes and reflowed whitespace that
//! the page may not share, so matching runs over a normalized projection.
//! Every normalized byte remembers the raw byte span it came from, letting
//! a match in normalized space map back to exact raw offsets.

/// A normalized projection of a raw string.
///
/// Normalization collapses whitespace runs to a single space, strips
/// leading/trailing whitespace, and maps typographic quote characters to
/// their ASCII forms. With `fold_case` the projection is also lowercased.
pub(crate) struct Normalized {
    pub text: String,
    raw_starts: Vec<usize>,
    raw_ends: Vec<usize>,
}

impl Normalized {
    pub fn new(raw: &str, fold_case: bool) -> Self {
        let mut out = Self {
            text: String::new(),
            raw_starts: Vec::with_capacity(raw.len()),
            raw_ends: Vec::with_capacity(raw.len()),
        };
        let mut pending_ws: Option<(usize, usize)> = None;

        for (idx, ch) in raw.char_indices() {
            let ch_end = idx + ch.len_utf8();
            if ch.is_whitespace() {
                pending_ws = Some(match pending_ws {
                    Some((start, _)) => (start, ch_end),
                    None => (idx, ch_end),
                });
                continue;
            }
            if let Some((ws_start, ws_end)) = pending_ws.take() {
                // Leading whitespace produces nothing; interior runs one space.
                if !out.text.is_empty() {
                    out.push(' ', ws_start, ws_end);
                }
            }
            let mapped = fold_quotes(ch);
            if fold_case {
                for low in mapped.to_lowercase() {
                    out.push(low, idx, ch_end);
                }
            } else {
                out.push(mapped, idx, ch_end);
            }
        }
        out
    }

    fn push(&mut self, ch: char, raw_start: usize, raw_end: usize) {
        for _ in 0..ch.len_utf8() {
            self.raw_starts.push(raw_start);
            self.raw_ends.push(raw_end);
        }
        self.text.push(ch);
    }

    /// Map a non-empty byte range of the normalized text back to raw offsets.
    pub fn raw_span(&self, start: usize, end: usize) -> (usize, usize) {
        debug_assert!(start < end && end <= self.text.len());
        (self.raw_starts[start], self.raw_ends[end - 1])
    }
}

fn fold_quotes(ch: char) -> char {
    match ch {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => '"',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_trims() {
        let n = Normalized::new("  The\t quick\nbrown  fox ", false);
        assert_eq!(n.text, "The quick brown fox");
    }

    #[test]
    fn folds_typographic_quotes() {
        let n = Normalized::new("\u{201C}it\u{2019}s fine\u{201D}", false);
        assert_eq!(n.text, "\"it's fine\"");
    }

    #[test]
    fn folds_case_when_asked() {
        let n = Normalized::new("The QUICK Fox", true);
        assert_eq!(n.text, "the quick fox");
    }

    #[test]
    fn raw_span_maps_through_collapsed_runs() {
        let raw = "The  quick\nbrown fox";
        let n = Normalized::new(raw, false);
        let pos = n.text.find("quick brown").unwrap();
        let (start, end) = n.raw_span(pos, pos + "quick brown".len());
        assert_eq!(&raw[start..end], "quick\nbrown");
    }

    #[test]
    fn raw_span_survives_leading_whitespace() {
        let raw = "   hello world";
        let n = Normalized::new(raw, false);
        let (start, end) = n.raw_span(0, n.text.len());
        assert_eq!(&raw[start..end], "hello world");
    }

    #[test]
    fn whitespace_only_input_is_empty() {
        assert!(Normalized::new(" \t\n ", false).text.is_empty());
    }
}
