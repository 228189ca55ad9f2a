// OCR Module
// Turns the engine's raw token stream into line structures the detectors
// and the span locator can work with:
// - line_builder: groups tokens into lines with per-token character spans
// - pass_merger: fuses the full-frame and ROI band passes into one stream
// - span_locator: maps query strings back to pixel bounding boxes

pub mod line_builder;
pub mod pass_merger;
pub mod span_locator;

pub use line_builder::{build_lines, extract_text_list, span_at_or_after, span_first_occurrence};
pub use pass_merger::{merge_passes, offset_tokens};
pub use span_locator::{find_text_boxes, find_text_boxes_in_data, DEFAULT_MERGE_GAP_PX};
