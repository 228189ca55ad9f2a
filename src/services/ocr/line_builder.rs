// Line Builder
// Reconstructs logical text lines from the flat OCR token stream and
// assigns every surviving token a character span inside its line.

use crate::models::{BoundingBox, Line, OcrTokenData, Token};
use std::collections::BTreeMap;
use tracing::debug;

struct LineAccum {
    text: String,
    tokens: Vec<(String, f64, BoundingBox)>,
    bbox: BoundingBox,
}

/// Exact positional search: locate `token` in `line` at or after `from`.
/// This is the primary tier; it keeps repeated token texts from all
/// resolving to the same occurrence.
pub fn span_at_or_after(line: &str, token: &str, from: usize) -> Option<(usize, usize)> {
    if from > line.len() {
        return None;
    }
    line[from..]
        .find(token)
        .map(|i| (from + i, from + i + token.len()))
}

/// First-occurrence fallback for tokens the positional tier misses
/// (OCR text normalization quirks, garbled duplicates). The resulting
/// span may be approximate; that is a known precision gap, not an error.
pub fn span_first_occurrence(line: &str, token: &str) -> Option<(usize, usize)> {
    line.find(token).map(|i| (i, i + token.len()))
}

/// Group tokens into lines by their `(block, par, line)` key and rebuild
/// each line's text and box.
///
/// Tokens below `min_conf` or with blank text are discarded. Grouping is
/// order independent (output is ordered by group key); within a group the
/// engine's native token order is preserved, which is what span assignment
/// depends on.
pub fn build_lines(data: &OcrTokenData, min_conf: f64) -> Vec<Line> {
    let mut groups: BTreeMap<(i32, i32, i32), LineAccum> = BTreeMap::new();

    for i in 0..data.len() {
        let txt = data.text[i].trim();
        if txt.is_empty() {
            continue;
        }
        if data.conf[i] < min_conf {
            continue;
        }

        let bbox = BoundingBox::new(data.left[i], data.top[i], data.width[i], data.height[i]);
        let key = (data.block_num[i], data.par_num[i], data.line_num[i]);

        match groups.get_mut(&key) {
            None => {
                groups.insert(
                    key,
                    LineAccum {
                        text: txt.to_string(),
                        tokens: vec![(txt.to_string(), data.conf[i], bbox)],
                        bbox,
                    },
                );
            }
            Some(acc) => {
                if !acc.text.ends_with(char::is_whitespace) {
                    acc.text.push(' ');
                }
                acc.text.push_str(txt);
                acc.tokens.push((txt.to_string(), data.conf[i], bbox));
                acc.bbox = acc.bbox.union(&bbox);
            }
        }
    }

    groups
        .into_values()
        .map(|acc| {
            let mut tokens = Vec::with_capacity(acc.tokens.len());
            let mut cursor = 0usize;
            for (text, confidence, bbox) in acc.tokens {
                let span = span_at_or_after(&acc.text, &text, cursor)
                    .or_else(|| span_first_occurrence(&acc.text, &text))
                    .unwrap_or_else(|| {
                        debug!(token = %text, "token text not found in line, assigning empty span");
                        (cursor.min(acc.text.len()), cursor.min(acc.text.len()))
                    });
                cursor = span.1 + 1;
                tokens.push(Token {
                    text,
                    confidence,
                    bbox,
                    span,
                });
            }
            Line {
                text: acc.text,
                bbox: acc.bbox,
                tokens,
            }
        })
        .collect()
}

/// Plain-text export of the reconstructed lines, in line order.
pub fn extract_text_list(data: &OcrTokenData, min_conf: f64) -> Vec<String> {
    build_lines(data, min_conf).into_iter().map(|l| l.text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn token_data(tokens: &[(&str, f64, i32, i32, i32, i32, (i32, i32, i32))]) -> OcrTokenData {
        let mut data = OcrTokenData::default();
        for (text, conf, x, y, w, h, key) in tokens {
            data.text.push(text.to_string());
            data.conf.push(*conf);
            data.left.push(*x);
            data.top.push(*y);
            data.width.push(*w);
            data.height.push(*h);
            data.block_num.push(key.0);
            data.par_num.push(key.1);
            data.line_num.push(key.2);
        }
        data
    }

    #[test]
    fn test_build_single_line_with_spans() {
        let data = token_data(&[
            ("my", 90.0, 0, 0, 20, 10, (1, 1, 1)),
            ("email", 88.0, 25, 0, 40, 10, (1, 1, 1)),
            ("a@b.com", 85.0, 70, 0, 60, 10, (1, 1, 1)),
        ]);
        let lines = build_lines(&data, 0.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "my email a@b.com");
        assert_eq!(lines[0].tokens[0].span, (0, 2));
        assert_eq!(lines[0].tokens[1].span, (3, 8));
        assert_eq!(lines[0].tokens[2].span, (9, 16));
        assert_eq!(lines[0].bbox, BoundingBox::new(0, 0, 130, 10));
    }

    #[test]
    fn test_spans_monotone_and_box_contains_tokens() {
        let data = token_data(&[
            ("foo", 90.0, 0, 0, 10, 10, (1, 1, 1)),
            ("bar", 90.0, 15, 2, 10, 12, (1, 1, 1)),
            ("foo", 90.0, 30, 0, 10, 10, (1, 1, 1)),
        ]);
        let lines = build_lines(&data, 0.0);
        let line = &lines[0];
        assert_eq!(line.text, "foo bar foo");
        // Repeated token text resolves to the second occurrence, not the first.
        assert_eq!(line.tokens[2].span, (8, 11));
        let mut prev_end = 0;
        for t in &line.tokens {
            assert!(t.span.0 >= prev_end);
            assert!(t.span.1 >= t.span.0);
            prev_end = t.span.1;
            assert!(line.bbox.contains_box(&t.bbox));
        }
    }

    #[test]
    fn test_low_confidence_and_blank_tokens_dropped() {
        let data = token_data(&[
            ("keep", 80.0, 0, 0, 10, 10, (1, 1, 1)),
            ("   ", 95.0, 15, 0, 10, 10, (1, 1, 1)),
            ("drop", 10.0, 30, 0, 10, 10, (1, 1, 1)),
        ]);
        let lines = build_lines(&data, 50.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "keep");
        assert_eq!(lines[0].tokens.len(), 1);
    }

    #[test]
    fn test_grouping_is_order_independent() {
        let sorted = token_data(&[
            ("one", 90.0, 0, 0, 10, 10, (1, 1, 1)),
            ("two", 90.0, 15, 0, 10, 10, (1, 1, 1)),
            ("three", 90.0, 0, 20, 10, 10, (1, 1, 2)),
            ("four", 90.0, 15, 20, 10, 10, (1, 1, 2)),
        ]);
        // Same tokens with the groups interleaved; intra-group order intact.
        let shuffled = token_data(&[
            ("three", 90.0, 0, 20, 10, 10, (1, 1, 2)),
            ("one", 90.0, 0, 0, 10, 10, (1, 1, 1)),
            ("four", 90.0, 15, 20, 10, 10, (1, 1, 2)),
            ("two", 90.0, 15, 0, 10, 10, (1, 1, 1)),
        ]);
        let a = build_lines(&sorted, 0.0);
        let b = build_lines(&shuffled, 0.0);
        assert_eq!(a.len(), b.len());
        for (la, lb) in a.iter().zip(b.iter()) {
            assert_eq!(la.text, lb.text);
            assert_eq!(la.bbox, lb.bbox);
            let spans_a: Vec<_> = la.tokens.iter().map(|t| t.span).collect();
            let spans_b: Vec<_> = lb.tokens.iter().map(|t| t.span).collect();
            assert_eq!(spans_a, spans_b);
        }
    }

    #[test]
    fn test_extract_text_list() {
        let data = token_data(&[
            ("hello", 90.0, 0, 0, 10, 10, (1, 1, 1)),
            ("world", 90.0, 15, 0, 10, 10, (1, 1, 1)),
            ("second", 90.0, 0, 20, 10, 10, (2, 1, 1)),
        ]);
        let texts = extract_text_list(&data, 0.0);
        assert_eq!(texts, vec!["hello world".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_span_search_tiers() {
        assert_eq!(span_at_or_after("foo bar foo", "foo", 4), Some((8, 11)));
        assert_eq!(span_at_or_after("foo bar", "baz", 0), None);
        assert_eq!(span_first_occurrence("foo bar foo", "foo"), Some((0, 3)));
    }
}
