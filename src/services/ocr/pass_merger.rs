// Pass Merger
// Combines the full-frame OCR pass with the region-of-interest band pass
// after shifting the band's boxes back into the source coordinate space.

use crate::models::OcrTokenData;

/// Shift every token box by the ROI origin so the pass shares the source
/// image's coordinate space.
pub fn offset_tokens(data: &mut OcrTokenData, offset: (i32, i32)) {
    let (dx, dy) = offset;
    for x in data.left.iter_mut() {
        *x += dx;
    }
    for y in data.top.iter_mut() {
        *y += dy;
    }
}

/// Concatenate two passes. Either side empty returns the other untouched.
///
/// Duplicate detections of the same on-screen text are intentionally kept:
/// a token-level dedup could discard distinct real occurrences, so
/// duplicates are resolved later at the finding level.
pub fn merge_passes(a: OcrTokenData, b: OcrTokenData) -> OcrTokenData {
    if a.is_empty() {
        return b;
    }
    if b.is_empty() {
        return a;
    }
    let mut out = a;
    out.text.extend(b.text);
    out.conf.extend(b.conf);
    out.left.extend(b.left);
    out.top.extend(b.top);
    out.width.extend(b.width);
    out.height.extend(b.height);
    out.block_num.extend(b.block_num);
    out.par_num.extend(b.par_num);
    out.line_num.extend(b.line_num);
    out
}
