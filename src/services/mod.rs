// ScreenGuard Core Services

pub mod config_store;
pub mod detection;
pub mod ocr;
pub mod providers;
pub mod scratch;
pub mod scrubber;

pub use config_store::*;
pub use providers::*;
pub use scratch::ScratchImage;
pub use scrubber::pre_scrub;

// Re-export the OCR and detection entry points
pub use ocr::{
    build_lines,
    extract_text_list,
    find_text_boxes,
    find_text_boxes_in_data,
    merge_passes,
    offset_tokens,
    DEFAULT_MERGE_GAP_PX,
};
pub use detection::{
    classify_text,
    detect_with_llm,
    filter_categories,
    luhn_ok,
    merge_findings,
    run_fallback,
    scan_lines,
    DetectorError,
};
