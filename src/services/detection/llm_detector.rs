// LLM Detector
// Sends the assembled OCR text to a remote DLP classifier and parses the
// returned finding spans. The remote model is an opaque oracle: anything
// other than a well-formed finding set is reported as a DetectorError so
// the pipeline can decide to fall back to the regex detector.

use crate::models::Findings;
use crate::services::config_store::{ConfigStore, DetectorConfig};
use crate::services::providers::{get_api_key, ProviderClient};
use tracing::{info, warn};

use super::DetectorError;

const DLP_SYSTEM_PROMPT: &str = r#"You are a security DLP classifier.
Given plain text from an OCR pass, identify sensitive data and return spans.
Rules:
- Return ONLY JSON: {"findings": [{"kind", "start", "end", "valuePreview", "confidence", "reason", "rule"}]}.
- Prefer high precision; do not hallucinate spans not present in text.
- Detect: api keys, tokens, JWTs, passwords, private key blocks, AWS keys, OAuth/Bearer tokens,
  credit cards (Luhn), IBAN, bank acct & routing numbers, SWIFT/BIC, emails, phones, IPs, addresses,
  national IDs (e.g., SSN/SIN), URLs that contain tokens.
- "kind" must be one of: api_key_unknown, aws_access_key_id, aws_secret_access_key,
  gcp_service_account_key, private_key_block, password, jwt, oauth_token, bearer_token,
  credit_card, iban, bank_account, routing_number, swift_bic, email, phone_number, address,
  ip_address, national_id, ssn, sin, url_with_token, license_plate.
- "start"/"end" are 0-based byte offsets into the text, end exclusive.
- For valuePreview, mask most of the value (e.g., last 4).
- confidence in [0,1]; reason should be brief (regex hit, checksum, format+context, etc.)."#;

const GEMINI_MODEL: &str = "gemini-2.5-flash";
const DEEPSEEK_MODEL: &str = "deepseek-chat";
const LLM_MAX_OUTPUT_TOKENS: i32 = 2048;

/// Extract the JSON object from a response that may carry prose or code
/// fences around it.
fn extract_json(content: &str) -> Result<String, DetectorError> {
    let content = content.trim();
    if content.starts_with('{') {
        Ok(content.to_string())
    } else if let Some(start) = content.find('{') {
        match content.rfind('}') {
            // The closing brace must come after the opening one, or the
            // response holds no object at all.
            Some(end) if end >= start => Ok(content[start..=end].to_string()),
            _ => Err(DetectorError::Parse("unterminated JSON in response".to_string())),
        }
    } else {
        Err(DetectorError::Parse("no JSON in response".to_string()))
    }
}

/// Parse the classifier's JSON, dropping findings whose spans do not fit
/// the analyzed text.
fn parse_findings(content: &str, text_len: usize) -> Result<Findings, DetectorError> {
    let json_str = extract_json(content)?;
    let mut parsed: Findings = serde_json::from_str(&json_str)
        .map_err(|e| DetectorError::Parse(format!("findings JSON: {}", e)))?;

    parsed.findings.retain(|f| {
        let valid = f.start <= f.end && f.end <= text_len;
        if !valid {
            warn!(
                kind = f.kind.as_str(),
                start = f.start,
                end = f.end,
                "discarding LLM finding with out-of-bounds span"
            );
        }
        valid
    });
    for f in parsed.findings.iter_mut() {
        f.confidence = f.confidence.clamp(0.0, 1.0);
    }
    Ok(parsed)
}

/// Probe order for provider selection: the configured default first,
/// then the rest. Unknown or missing preference keeps the stock order.
fn provider_order(preferred: Option<&str>) -> [(&'static str, &'static str); 2] {
    match preferred {
        Some("deepseek") => [("deepseek", DEEPSEEK_MODEL), ("gemini", GEMINI_MODEL)],
        _ => [("gemini", GEMINI_MODEL), ("deepseek", DEEPSEEK_MODEL)],
    }
}

fn pick_provider() -> Option<(&'static str, &'static str, String)> {
    let preferred = ConfigStore::default_config_dir()
        .map(ConfigStore::new)
        .and_then(|store| store.load().ok())
        .and_then(|cfg| cfg.default_provider);

    for (name, model) in provider_order(preferred.as_deref()) {
        if let Some(key) = get_api_key(name) {
            return Some((name, model, key));
        }
    }
    None
}

async fn call_provider(
    client: &ProviderClient,
    provider: &str,
    model: &str,
    api_key: &str,
    text: &str,
) -> Result<Findings, DetectorError> {
    let result = if provider == "gemini" {
        let prompt = format!("{}\n\nTEXT START\n{}\nTEXT END", DLP_SYSTEM_PROMPT, text);
        client
            .call_gemini_json(model, api_key, &prompt, LLM_MAX_OUTPUT_TOKENS)
            .await
    } else {
        let user = format!(
            "Classify the following text and return findings as JSON.\n\nTEXT START\n{}\nTEXT END",
            text
        );
        client
            .call_deepseek_json(model, api_key, DLP_SYSTEM_PROMPT, &user, LLM_MAX_OUTPUT_TOKENS)
            .await
    };

    let chat = result?;
    parse_findings(&chat.content, text.len())
}

/// Run the remote DLP pass with a per-attempt timeout and bounded retries.
pub async fn detect_with_llm(
    client: &ProviderClient,
    text: &str,
    config: &DetectorConfig,
) -> Result<Findings, DetectorError> {
    let (provider, model, api_key) = pick_provider().ok_or(DetectorError::MissingApiKey)?;

    let timeout = std::time::Duration::from_secs(config.llm_timeout_secs);
    let attempts = config.llm_max_attempts.max(1);
    let mut last_err = DetectorError::MissingApiKey;

    for attempt in 1..=attempts {
        let fut = call_provider(client, provider, model, &api_key, text);
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(findings)) => {
                info!(
                    provider,
                    model,
                    attempt,
                    findings = findings.findings.len(),
                    "[LLM_DETECTOR] classification ok"
                );
                return Ok(findings);
            }
            Ok(Err(e)) => {
                warn!(provider, model, attempt, "[LLM_DETECTOR] error: {}", e);
                last_err = e;
            }
            Err(_) => {
                warn!(
                    provider,
                    model, attempt, "[LLM_DETECTOR] timeout ({}s)", config.llm_timeout_secs
                );
                last_err = DetectorError::Timeout(config.llm_timeout_secs);
            }
        }

        if attempt < attempts {
            // Simple backoff to reduce rate-limit and transient failures.
            let backoff_ms = 400u64 * attempt as u64;
            tokio::time::sleep(std::time::Duration::from_millis(backoff_ms)).await;
        }
    }

    Err(last_err)
}
