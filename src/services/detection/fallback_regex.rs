// Fallback Regex Detector
// Deterministic pattern detectors that run without any remote call:
// email, phone number, and Luhn-gated credit-card digit runs.

use crate::models::{Finding, FindingKind, Findings};
use regex::Regex;
use std::sync::OnceLock;

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[A-Za-z]{2,}\b").expect("email regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?(?:\(?\d{3}\)?[-.\s]?){2}\d{4}\b").expect("phone regex")
    })
}

fn credit_card_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(?:\d[ -]*?){13,19}\b").expect("credit card regex"))
}

/// Luhn checksum over a card-like digit run. Non-digits are stripped
/// first; the run must carry 13 to 19 digits.
pub fn luhn_ok(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    let mut checksum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut d = d;
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        checksum += d;
    }
    checksum % 10 == 0
}

fn mask_prefix(value: &str, keep: usize) -> String {
    let head: String = value.chars().take(keep).collect();
    format!("{}***", head)
}

fn mask_suffix(value: &str, keep: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(keep)..].iter().collect();
    format!("***{}", tail)
}

/// Run the fixed detector list over a text buffer.
///
/// Digit runs failing the Luhn check are dropped silently, not reported as
/// low-confidence findings.
pub fn run_fallback(text: &str) -> Findings {
    let mut out: Vec<Finding> = Vec::new();

    for m in email_re().find_iter(text) {
        out.push(Finding {
            kind: FindingKind::Email,
            start: m.start(),
            end: m.end(),
            value_preview: mask_prefix(m.as_str(), 2),
            confidence: 0.85,
            reason: "regex".to_string(),
            rule: None,
        });
    }

    for m in phone_re().find_iter(text) {
        out.push(Finding {
            kind: FindingKind::PhoneNumber,
            start: m.start(),
            end: m.end(),
            value_preview: mask_suffix(m.as_str(), 4),
            confidence: 0.6,
            reason: "regex".to_string(),
            rule: None,
        });
    }

    for m in credit_card_re().find_iter(text) {
        if !luhn_ok(m.as_str()) {
            continue;
        }
        let digits: String = m.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        let last4 = &digits[digits.len().saturating_sub(4)..];
        out.push(Finding {
            kind: FindingKind::CreditCard,
            start: m.start(),
            end: m.end(),
            value_preview: format!("**** **** **** {}", last4),
            confidence: 0.9,
            reason: "regex+luhn".to_string(),
            rule: None,
        });
    }

    Findings { findings: out }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_accepts_valid_visa() {
        assert!(luhn_ok("4111111111111111"));
        assert!(luhn_ok("4111 1111 1111 1111"));
    }

    #[test]
    fn test_luhn_rejects_bad_checksum_and_length() {
        assert!(!luhn_ok("4111111111111112"));
        assert!(!luhn_ok("411111111111")); // 12 digits, too short
        assert!(!luhn_ok("41111111111111111111")); // 20 digits, too long
    }

    #[test]
    fn test_email_finding_with_offsets() {
        let text = "my email is a@b.com today";
        let findings = run_fallback(text).findings;
        let email: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::Email)
            .collect();
        assert_eq!(email.len(), 1);
        assert_eq!(&text[email[0].start..email[0].end], "a@b.com");
        assert_eq!(email[0].value_preview, "a@***");
        assert_eq!(email[0].confidence, 0.85);
    }

    #[test]
    fn test_phone_finding_masks_all_but_last_four() {
        let findings = run_fallback("call 555-123-4567 now").findings;
        let phone: Vec<_> = findings
            .iter()
            .filter(|f| f.kind == FindingKind::PhoneNumber)
            .collect();
        assert_eq!(phone.len(), 1);
        assert_eq!(phone[0].value_preview, "***4567");
    }

    #[test]
    fn test_credit_card_requires_luhn() {
        let valid = run_fallback("card 4111111111111111 ok").findings;
        assert!(valid.iter().any(|f| f.kind == FindingKind::CreditCard));
        let card = valid
            .iter()
            .find(|f| f.kind == FindingKind::CreditCard)
            .unwrap();
        assert_eq!(card.value_preview, "**** **** **** 1111");
        assert_eq!(card.reason, "regex+luhn");

        // Checksum failure: dropped, no low-confidence finding either.
        let invalid = run_fallback("card 4111111111111112 bad").findings;
        assert!(!invalid.iter().any(|f| f.kind == FindingKind::CreditCard));
    }

    #[test]
    fn test_clean_text_yields_no_findings() {
        let findings = run_fallback("nothing sensitive here").findings;
        assert!(findings.is_empty());
    }
}
