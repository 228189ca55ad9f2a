// ScreenGuard Data Models
// Mirrors the JSON shapes exchanged with the OCR engine and downstream consumers.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============ Coordinate spaces & boxes ============

/// Which pixel coordinate space a box is expressed in.
///
/// OCR runs on an upscaled copy of the capture, so boxes coming out of the
/// token stream are in `UpscaledOcr` space until explicitly converted.
/// The two spaces must never be mixed implicitly.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CoordSpace {
    RawCapture,
    UpscaledOcr,
}

/// Axis-aligned pixel rectangle. Width and height are never negative;
/// the constructor clamps rather than painting undefined regions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: w.max(0),
            h: h.max(0),
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Coordinate-wise union: min of tops/lefts, max of bottoms/rights.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x1 = self.x.min(other.x);
        let y1 = self.y.min(other.y);
        let x2 = self.right().max(other.right());
        let y2 = self.bottom().max(other.bottom());
        BoundingBox::new(x1, y1, x2 - x1, y2 - y1)
    }

    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }
}

/// A list of boxes tagged with the space they live in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxSet {
    pub space: CoordSpace,
    pub boxes: Vec<BoundingBox>,
}

impl BoxSet {
    pub fn empty(space: CoordSpace) -> Self {
        Self {
            space,
            boxes: Vec::new(),
        }
    }

    /// Undo the OCR-time upscale so boxes can be painted on the original
    /// capture. No-op when already in raw space.
    pub fn to_raw_capture(&self, upscale: f64) -> BoxSet {
        if self.space == CoordSpace::RawCapture || upscale <= 0.0 {
            return self.clone();
        }
        let boxes = self
            .boxes
            .iter()
            .map(|b| {
                BoundingBox::new(
                    (b.x as f64 / upscale).floor() as i32,
                    (b.y as f64 / upscale).floor() as i32,
                    (b.w as f64 / upscale).ceil() as i32,
                    (b.h as f64 / upscale).ceil() as i32,
                )
            })
            .collect();
        BoxSet {
            space: CoordSpace::RawCapture,
            boxes,
        }
    }
}

// ============ Raw OCR token stream ============

/// One OCR pass as the engine emits it: parallel arrays, index `i`
/// describes one token. Kept in wire shape so passes can be merged by
/// plain concatenation before any interpretation happens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrTokenData {
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub conf: Vec<f64>,
    #[serde(default)]
    pub left: Vec<i32>,
    #[serde(default)]
    pub top: Vec<i32>,
    #[serde(default)]
    pub width: Vec<i32>,
    #[serde(default)]
    pub height: Vec<i32>,
    #[serde(default)]
    pub block_num: Vec<i32>,
    #[serde(default)]
    pub par_num: Vec<i32>,
    #[serde(default)]
    pub line_num: Vec<i32>,
}

impl OcrTokenData {
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// All parallel arrays must share one length.
    pub fn validate(&self) -> Result<(), String> {
        let n = self.text.len();
        let lengths = [
            ("conf", self.conf.len()),
            ("left", self.left.len()),
            ("top", self.top.len()),
            ("width", self.width.len()),
            ("height", self.height.len()),
            ("block_num", self.block_num.len()),
            ("par_num", self.par_num.len()),
            ("line_num", self.line_num.len()),
        ];
        for (name, len) in lengths {
            if len != n {
                return Err(format!(
                    "parallel array mismatch: text has {} entries, {} has {}",
                    n, name, len
                ));
            }
        }
        Ok(())
    }
}

// ============ Reconstructed lines ============

/// One recognized word run with its assigned character span inside the
/// owning line's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub text: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// UTF-8 byte offsets (start, end-exclusive) into `Line::text`.
    /// Approximate when the fallback span search had to be used.
    pub span: (usize, usize),
}

/// A logical text line rebuilt from the token stream. The box is the union
/// of every member token box; token spans are monotone and non-overlapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub text: String,
    pub bbox: BoundingBox,
    pub tokens: Vec<Token>,
}

// ============ Findings ============

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    // credentials & tokens
    ApiKeyUnknown,
    AwsAccessKeyId,
    AwsSecretAccessKey,
    GcpServiceAccountKey,
    PrivateKeyBlock,
    Password,
    Jwt,
    OauthToken,
    BearerToken,
    // financial info
    CreditCard,
    Iban,
    BankAccount,
    RoutingNumber,
    SwiftBic,
    // contact info
    Email,
    PhoneNumber,
    Address,
    IpAddress,
    NationalId,
    Ssn,
    Sin,
    // misc
    UrlWithToken,
    LicensePlate,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiKeyUnknown => "api_key_unknown",
            Self::AwsAccessKeyId => "aws_access_key_id",
            Self::AwsSecretAccessKey => "aws_secret_access_key",
            Self::GcpServiceAccountKey => "gcp_service_account_key",
            Self::PrivateKeyBlock => "private_key_block",
            Self::Password => "password",
            Self::Jwt => "jwt",
            Self::OauthToken => "oauth_token",
            Self::BearerToken => "bearer_token",
            Self::CreditCard => "credit_card",
            Self::Iban => "iban",
            Self::BankAccount => "bank_account",
            Self::RoutingNumber => "routing_number",
            Self::SwiftBic => "swift_bic",
            Self::Email => "email",
            Self::PhoneNumber => "phone_number",
            Self::Address => "address",
            Self::IpAddress => "ip_address",
            Self::NationalId => "national_id",
            Self::Ssn => "ssn",
            Self::Sin => "sin",
            Self::UrlWithToken => "url_with_token",
            Self::LicensePlate => "license_plate",
        }
    }
}

/// One detected sensitive-data occurrence. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub kind: FindingKind,
    /// UTF-8 byte offset (0-based) into the analyzed text.
    pub start: usize,
    /// UTF-8 byte offset (0-based, end-exclusive) into the analyzed text.
    pub end: usize,
    /// Short masked preview, never the full value.
    pub value_preview: String,
    pub confidence: f64,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// Wire shape shared with the LLM detector's JSON schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Findings {
    #[serde(default)]
    pub findings: Vec<Finding>,
}

// ============ Query & scan options ============

/// Options for locating a literal query string in reconstructed lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    #[serde(default)]
    pub min_confidence: f64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whole_word: false,
            min_confidence: 0.0,
        }
    }
}

/// Caller-supplied category toggles. An empty map means "detect all".
pub type CategoryFilter = HashMap<String, bool>;

/// Result of a full scan: classified findings over the assembled line text
/// plus the pixel regions to redact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub findings: Vec<Finding>,
    pub boxes: BoxSet,
    pub request_id: String,
}
