// Span Locator
// Maps a literal query string to the minimal set of pixel boxes covering
// every occurrence of the query in the reconstructed lines.
//
// Boxes are returned in upscaled-OCR space; callers undo the OCR upscale
// via `BoxSet::to_raw_capture` before painting on the original capture.

use crate::models::{BoundingBox, BoxSet, CoordSpace, Line, OcrTokenData, QueryOptions};
use regex::RegexBuilder;

use super::line_builder::build_lines;

/// Default horizontal gap (pixels, upscaled-OCR space) below which two
/// adjacent token boxes are fused into one run.
pub const DEFAULT_MERGE_GAP_PX: i32 = 6;

/// Locate every occurrence of `query` across the given lines.
///
/// One match produces one or more boxes depending on how many disjoint
/// visual runs its tokens form (a logical match can be split across token
/// gaps or a line wrap). A match overlapping no token span degrades to the
/// whole line's box: over-redacting beats under-redacting.
pub fn find_text_boxes(
    lines: &[Line],
    query: &str,
    opts: &QueryOptions,
    merge_gap_px: i32,
) -> BoxSet {
    let mut out = BoxSet::empty(CoordSpace::UpscaledOcr);
    if query.is_empty() {
        return out;
    }

    let pattern = if opts.whole_word {
        format!(r"\b{}\b", regex::escape(query))
    } else {
        regex::escape(query)
    };
    let rx = RegexBuilder::new(&pattern)
        .case_insensitive(!opts.case_sensitive)
        .build()
        .expect("escaped literal query regex");

    for line in lines {
        for m in rx.find_iter(&line.text) {
            let (s, e) = (m.start(), m.end());
            let mut token_boxes: Vec<BoundingBox> = line
                .tokens
                .iter()
                .filter(|t| t.span.1 > s && t.span.0 < e)
                .map(|t| t.bbox)
                .collect();

            if token_boxes.is_empty() {
                // Match fell into an inter-token separator or a
                // fallback-span gap.
                out.boxes.push(line.bbox);
                continue;
            }

            token_boxes.sort_by_key(|b| b.x);
            out.boxes.extend(merge_adjacent(&token_boxes, merge_gap_px));
        }
    }

    out
}

/// Convenience wrapper matching the raw-pass interface: rebuild lines with
/// the query's confidence floor, then locate.
pub fn find_text_boxes_in_data(
    data: &OcrTokenData,
    query: &str,
    opts: &QueryOptions,
    merge_gap_px: i32,
) -> BoxSet {
    let lines = build_lines(data, opts.min_confidence);
    find_text_boxes(&lines, query, opts, merge_gap_px)
}

/// Fuse x-sorted boxes into visual runs. Two boxes merge when the
/// horizontal gap is at most `gap_px` and their vertical offset is smaller
/// than the taller of the two; otherwise a new run starts.
fn merge_adjacent(sorted: &[BoundingBox], gap_px: i32) -> Vec<BoundingBox> {
    let mut merged: Vec<BoundingBox> = Vec::new();
    for b in sorted {
        match merged.last_mut() {
            Some(prev) if b.x <= prev.right() + gap_px && (b.y - prev.y).abs() < b.h.max(prev.h) => {
                *prev = prev.union(b);
            }
            _ => merged.push(*b),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Token;

    fn line_from_tokens(tokens: &[(&str, i32, i32, i32, i32)]) -> Line {
        let mut text = String::new();
        let mut toks = Vec::new();
        let mut bbox: Option<BoundingBox> = None;
        for (t, x, y, w, h) in tokens {
            if !text.is_empty() {
                text.push(' ');
            }
            let start = text.len();
            text.push_str(t);
            let b = BoundingBox::new(*x, *y, *w, *h);
            bbox = Some(match bbox {
                Some(acc) => acc.union(&b),
                None => b,
            });
            toks.push(Token {
                text: t.to_string(),
                confidence: 90.0,
                bbox: b,
                span: (start, start + t.len()),
            });
        }
        Line {
            text,
            bbox: bbox.unwrap_or(BoundingBox::new(0, 0, 0, 0)),
            tokens: toks,
        }
    }

    #[test]
    fn test_single_token_match_returns_one_box() {
        let line = line_from_tokens(&[
            ("my", 0, 0, 20, 10),
            ("email", 25, 0, 40, 10),
            ("is", 70, 0, 15, 10),
            ("a@b.com", 90, 0, 60, 10),
            ("today", 155, 0, 40, 10),
        ]);
        let set = find_text_boxes(&[line], "a@b.com", &QueryOptions::default(), DEFAULT_MERGE_GAP_PX);
        assert_eq!(set.space, CoordSpace::UpscaledOcr);
        assert_eq!(set.boxes, vec![BoundingBox::new(90, 0, 60, 10)]);
    }

    #[test]
    fn test_case_sensitivity_flag() {
        let line = line_from_tokens(&[("api_key=xyz", 0, 0, 80, 10)]);
        let insensitive = find_text_boxes(
            &[line.clone()],
            "API_KEY",
            &QueryOptions::default(),
            DEFAULT_MERGE_GAP_PX,
        );
        assert_eq!(insensitive.boxes.len(), 1);

        let sensitive = find_text_boxes(
            &[line],
            "API_KEY",
            &QueryOptions {
                case_sensitive: true,
                ..Default::default()
            },
            DEFAULT_MERGE_GAP_PX,
        );
        assert!(sensitive.boxes.is_empty());
    }

    #[test]
    fn test_empty_query_returns_empty() {
        let line = line_from_tokens(&[("anything", 0, 0, 40, 10)]);
        let set = find_text_boxes(&[line], "", &QueryOptions::default(), DEFAULT_MERGE_GAP_PX);
        assert!(set.boxes.is_empty());
    }

    #[test]
    fn test_adjacent_boxes_merge_into_one_run() {
        // Gap of 5px and overlapping vertical extents: one fused box.
        let merged = merge_adjacent(
            &[BoundingBox::new(10, 10, 20, 10), BoundingBox::new(35, 12, 20, 10)],
            DEFAULT_MERGE_GAP_PX,
        );
        assert_eq!(merged, vec![BoundingBox::new(10, 10, 45, 12)]);

        // Far apart horizontally: two runs.
        let split = merge_adjacent(
            &[BoundingBox::new(10, 10, 20, 10), BoundingBox::new(200, 10, 20, 10)],
            DEFAULT_MERGE_GAP_PX,
        );
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_match_spanning_tokens_yields_merged_run() {
        let line = line_from_tokens(&[("secret", 0, 0, 40, 10), ("key", 44, 0, 25, 10)]);
        let set = find_text_boxes(
            &[line],
            "secret key",
            &QueryOptions::default(),
            DEFAULT_MERGE_GAP_PX,
        );
        assert_eq!(set.boxes, vec![BoundingBox::new(0, 0, 69, 10)]);
    }

    #[test]
    fn test_no_overlapping_token_falls_back_to_line_box() {
        // A token whose span search failed gets an empty span, so a match
        // inside its text overlaps nothing.
        let line = Line {
            text: "ab cd".to_string(),
            bbox: BoundingBox::new(0, 0, 100, 12),
            tokens: vec![Token {
                text: "ab".to_string(),
                confidence: 90.0,
                bbox: BoundingBox::new(0, 0, 30, 12),
                span: (0, 2),
            }],
        };
        let set = find_text_boxes(&[line], "cd", &QueryOptions::default(), DEFAULT_MERGE_GAP_PX);
        assert_eq!(set.boxes, vec![BoundingBox::new(0, 0, 100, 12)]);
    }

    #[test]
    fn test_whole_word_anchoring() {
        let line = line_from_tokens(&[("keyring", 0, 0, 50, 10)]);
        let set = find_text_boxes(
            &[line],
            "key",
            &QueryOptions {
                whole_word: true,
                ..Default::default()
            },
            DEFAULT_MERGE_GAP_PX,
        );
        assert!(set.boxes.is_empty());
    }

    #[test]
    fn test_locate_from_raw_pass() {
        let mut data = OcrTokenData::default();
        for (text, conf, x) in [("user", 90.0, 0), ("a@b.com", 40.0, 30)] {
            data.text.push(text.to_string());
            data.conf.push(conf);
            data.left.push(x);
            data.top.push(0);
            data.width.push(25);
            data.height.push(10);
            data.block_num.push(1);
            data.par_num.push(1);
            data.line_num.push(1);
        }
        // Confidence floor above the email token's confidence: no match.
        let opts = QueryOptions {
            min_confidence: 50.0,
            ..Default::default()
        };
        let set = find_text_boxes_in_data(&data, "a@b.com", &opts, DEFAULT_MERGE_GAP_PX);
        assert!(set.boxes.is_empty());

        let set = find_text_boxes_in_data(
            &data,
            "a@b.com",
            &QueryOptions::default(),
            DEFAULT_MERGE_GAP_PX,
        );
        assert_eq!(set.boxes.len(), 1);
    }
}
