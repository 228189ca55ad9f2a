// Detection Module
// Sensitive-data classification organized into specialized submodules:
// - fallback_regex: deterministic pattern + checksum detectors
// - llm_detector: remote DLP classification returning finding spans
// - pipeline: sequences both detectors, de-duplicates and orders findings

pub mod fallback_regex;
pub mod llm_detector;
pub mod pipeline;

use thiserror::Error;

/// Why a detector stage failed. The pipeline inspects this to decide on a
/// fallback instead of masking all failure classes identically.
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("no API key configured for any LLM provider")]
    MissingApiKey,
    #[error("provider call failed: {0}")]
    Provider(#[from] crate::services::providers::ProviderError),
    #[error("LLM call timed out after {0}s")]
    Timeout(u64),
    #[error("unparseable detector response: {0}")]
    Parse(String),
}

pub use fallback_regex::{luhn_ok, run_fallback};
pub use llm_detector::detect_with_llm;
pub use pipeline::{classify_text, filter_categories, merge_findings, scan_lines};
