// Detection Pipeline
// Sequences the regex and LLM detectors over one text buffer, merges their
// findings, and maps each finding back to pixel regions via the span
// locator. A classification pass always yields a (possibly empty) finding
// set; remote failures degrade to regex-only, never to an error.

use crate::models::{BoxSet, CategoryFilter, CoordSpace, Finding, Findings, Line, QueryOptions, ScanOutcome};
use crate::services::config_store::DetectorConfig;
use crate::services::detection::{detect_with_llm, run_fallback};
use crate::services::ocr::find_text_boxes;
use crate::services::providers::ProviderClient;
use crate::services::scrubber::pre_scrub;
use tracing::{info, warn};
use uuid::Uuid;

/// Add each extra finding unless an existing one is a near duplicate:
/// same kind with both span edges within `slack` bytes. Exact-match dedup
/// would miss boundary disagreements between the two detectors.
pub fn merge_findings(base: Vec<Finding>, extra: Vec<Finding>, slack: usize) -> Vec<Finding> {
    let mut merged = base;
    for f in extra {
        let dup = merged.iter().any(|g| {
            f.kind == g.kind && f.start.abs_diff(g.start) < slack && f.end.abs_diff(g.end) < slack
        });
        if !dup {
            merged.push(f);
        }
    }
    merged
}

/// Apply the caller's category toggles. An empty filter detects all.
pub fn filter_categories(findings: Vec<Finding>, filter: &CategoryFilter) -> Vec<Finding> {
    if filter.is_empty() {
        return findings;
    }
    findings
        .into_iter()
        .filter(|f| filter.get(f.kind.as_str()).copied().unwrap_or(false))
        .collect()
}

/// Classify one text buffer with the two-stage pipeline.
pub async fn classify_text(
    text: &str,
    config: &DetectorConfig,
    client: &ProviderClient,
) -> Findings {
    // Privacy-first: mask blatant secrets before anything leaves the
    // process. The scrub is byte-length preserving, so offsets produced
    // against the scrubbed buffer are valid for the original.
    let scrubbed;
    let analyzed: &str = if config.privacy_first {
        let (s, masked) = pre_scrub(text);
        if masked > 0 {
            info!(masked, "pre-scrubbed secrets before remote submission");
        }
        scrubbed = s;
        &scrubbed
    } else {
        text
    };

    let base = if config.use_fallback {
        run_fallback(analyzed).findings
    } else {
        Vec::new()
    };

    let merged = match detect_with_llm(client, analyzed, config).await {
        Ok(llm) => merge_findings(base, llm.findings, config.near_duplicate_slack),
        Err(e) => {
            warn!("LLM detector unavailable, using regex findings only: {}", e);
            base
        }
    };

    let mut findings = filter_categories(merged, &config.categories);
    findings.sort_by_key(|f| (f.start, f.end));
    Findings { findings }
}

/// Full scan over reconstructed lines: assemble the line texts into one
/// buffer, classify it, then hand each finding's matched text to the span
/// locator and collect the pixel regions to redact.
pub async fn scan_lines(
    lines: &[Line],
    config: &DetectorConfig,
    client: &ProviderClient,
) -> ScanOutcome {
    let request_id = Uuid::new_v4().to_string();
    let text = lines
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let findings = classify_text(&text, config, client).await.findings;

    let opts = QueryOptions {
        case_sensitive: false,
        whole_word: false,
        min_confidence: config.min_confidence,
    };

    let mut boxes = BoxSet::empty(CoordSpace::UpscaledOcr);
    for f in &findings {
        // Query with the on-screen text, not the masked preview. Slicing
        // through `get` guards against a span landing off a char boundary.
        let Some(query) = text.get(f.start..f.end) else {
            warn!(start = f.start, end = f.end, "finding span not sliceable, skipping");
            continue;
        };
        let located = find_text_boxes(lines, query, &opts, config.merge_gap_px);
        boxes.boxes.extend(located.boxes);
    }

    info!(
        request_id = %request_id,
        findings = findings.len(),
        boxes = boxes.boxes.len(),
        "scan complete"
    );

    ScanOutcome {
        findings,
        boxes,
        request_id,
    }
}
