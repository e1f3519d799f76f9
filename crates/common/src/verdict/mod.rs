//! Verdict parsing and normalization
//!
//! The analysis oracle returns free text that is expected, but not
//! guaranteed, to contain a JSON object (often inside a fenced code block).
//! `parse_verdict` turns that text into a fully-defaulted [`Verdict`] and
//! never fails: malformed output degrades to a fallback verdict that
//! preserves the raw text for human inspection.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Oracle-assigned risk level. The level is taken from the oracle as-is and
/// never recomputed from the score downstream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Parse a level string, defaulting unknown values to medium
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            "critical" => RiskLevel::Critical,
            _ => RiskLevel::Medium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

/// Fraud flag severity
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Parse a severity string, defaulting unknown values to low
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            "critical" => Severity::Critical,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

/// Percentage-based bounding box, each component 0-100 of page dimensions
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegionCoords {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// One normalized fraud flag
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictFlag {
    pub flag_type: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    /// 0-100
    pub confidence: i32,
    pub evidence_reference: Option<String>,
    pub page_number: Option<i32>,
    pub region_coords: Option<RegionCoords>,
}

/// One normalized extracted field
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VerdictField {
    pub field_name: String,
    pub field_value: String,
    /// 0-100
    pub confidence: i32,
}

/// Fully-defaulted verdict, the structured result of one analysis attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    /// 0-100
    pub overall_risk_score: i32,
    pub risk_level: RiskLevel,
    pub document_type: String,
    pub ocr_text: Option<String>,
    pub fraud_flags: Vec<VerdictFlag>,
    pub extracted_fields: Vec<VerdictField>,
    pub passed_checks: Vec<String>,
    pub analysis_summary: Option<String>,
}

// Defaults applied when the oracle omits a key
const DEFAULT_RISK_SCORE: i32 = 50;
const DEFAULT_DOCUMENT_TYPE: &str = "Unknown Document";
const DEFAULT_FLAG_TYPE: &str = "visual_forensics";
const DEFAULT_FLAG_NAME: &str = "Unknown Issue";
const DEFAULT_FLAG_CONFIDENCE: i32 = 50;
const DEFAULT_FIELD_CONFIDENCE: i32 = 80;

/// Raw wire shape. Every key is optional; the oracle's output format is a
/// convention, not a guarantee.
#[derive(Debug, Deserialize)]
struct RawVerdict {
    overall_risk_score: Option<f64>,
    risk_level: Option<String>,
    document_type: Option<String>,
    ocr_text: Option<String>,
    fraud_flags: Option<Vec<RawFlag>>,
    extracted_fields: Option<Vec<RawField>>,
    passed_checks: Option<Vec<String>>,
    analysis_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFlag {
    flag_type: Option<String>,
    name: Option<String>,
    description: Option<String>,
    severity: Option<String>,
    confidence: Option<f64>,
    evidence_reference: Option<String>,
    page_number: Option<i32>,
    region_coords: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    field_name: Option<String>,
    field_value: Option<String>,
    confidence: Option<f64>,
}

fn clamp_score(value: f64) -> i32 {
    value.round().clamp(0.0, 100.0) as i32
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Locate the JSON candidate in the oracle's text: the first fenced code
/// block if present, otherwise the whole text.
fn extract_json_candidate(raw: &str) -> &str {
    fence_regex()
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
        .trim()
}

/// Parse the oracle's raw text into a verdict. Total: malformed input
/// produces the degraded fallback verdict instead of an error.
pub fn parse_verdict(raw_text: &str) -> Verdict {
    let candidate = extract_json_candidate(raw_text);

    match serde_json::from_str::<RawVerdict>(candidate) {
        Ok(raw) => normalize(raw),
        Err(e) => {
            let preview: String = raw_text.chars().take(200).collect();
            tracing::warn!(
                error = %e,
                preview = %preview,
                "Oracle output was not valid JSON, using fallback verdict"
            );
            fallback_verdict(raw_text)
        }
    }
}

/// Degraded verdict used when the oracle output cannot be parsed. The raw
/// text is preserved as OCR output so a human can still inspect it.
fn fallback_verdict(raw_text: &str) -> Verdict {
    metrics::counter!("veridoc_verdict_fallbacks_total").increment(1);

    Verdict {
        overall_risk_score: DEFAULT_RISK_SCORE,
        risk_level: RiskLevel::Medium,
        document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        ocr_text: Some(raw_text.to_string()),
        fraud_flags: Vec::new(),
        extracted_fields: Vec::new(),
        passed_checks: vec!["Analysis completed with limited results".to_string()],
        analysis_summary: None,
    }
}

fn normalize(raw: RawVerdict) -> Verdict {
    let fraud_flags = raw
        .fraud_flags
        .unwrap_or_default()
        .into_iter()
        .map(normalize_flag)
        .collect();

    // Partial extractions are not stored
    let extracted_fields = raw
        .extracted_fields
        .unwrap_or_default()
        .into_iter()
        .filter_map(normalize_field)
        .collect();

    Verdict {
        overall_risk_score: raw
            .overall_risk_score
            .map(clamp_score)
            .unwrap_or(DEFAULT_RISK_SCORE),
        risk_level: raw
            .risk_level
            .as_deref()
            .map(RiskLevel::from_str_lossy)
            .unwrap_or_default(),
        document_type: raw
            .document_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
        ocr_text: raw.ocr_text.filter(|t| !t.is_empty()),
        fraud_flags,
        extracted_fields,
        passed_checks: raw.passed_checks.unwrap_or_default(),
        analysis_summary: raw.analysis_summary.filter(|s| !s.is_empty()),
    }
}

fn normalize_flag(raw: RawFlag) -> VerdictFlag {
    VerdictFlag {
        flag_type: raw
            .flag_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_FLAG_TYPE.to_string()),
        name: raw
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_FLAG_NAME.to_string()),
        description: raw.description.unwrap_or_default(),
        severity: raw
            .severity
            .as_deref()
            .map(Severity::from_str_lossy)
            .unwrap_or_default(),
        confidence: raw
            .confidence
            .map(clamp_score)
            .unwrap_or(DEFAULT_FLAG_CONFIDENCE),
        evidence_reference: raw.evidence_reference.filter(|e| !e.is_empty()),
        page_number: raw.page_number,
        region_coords: raw.region_coords.and_then(parse_region),
    }
}

/// A region that is not a well-formed `{x, y, width, height}` object is
/// treated as absent rather than failing the flag.
fn parse_region(value: serde_json::Value) -> Option<RegionCoords> {
    serde_json::from_value(value).ok()
}

fn normalize_field(raw: RawField) -> Option<VerdictField> {
    let field_name = raw.field_name.filter(|n| !n.is_empty())?;
    let field_value = raw.field_value.filter(|v| !v.is_empty())?;

    Some(VerdictField {
        field_name,
        field_value,
        confidence: raw
            .confidence
            .map(clamp_score)
            .unwrap_or(DEFAULT_FIELD_CONFIDENCE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prose_falls_back() {
        let verdict = parse_verdict("I could not analyze this document, sorry.");
        assert_eq!(verdict.overall_risk_score, 50);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(verdict.document_type, "Unknown Document");
        assert_eq!(
            verdict.ocr_text.as_deref(),
            Some("I could not analyze this document, sorry.")
        );
        assert!(verdict.fraud_flags.is_empty());
        assert_eq!(
            verdict.passed_checks,
            vec!["Analysis completed with limited results".to_string()]
        );
    }

    #[test]
    fn test_truncated_json_falls_back() {
        let verdict = parse_verdict(r#"{"overall_risk_score": 72, "risk_level": "hi"#);
        assert_eq!(verdict.overall_risk_score, 50);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_fenced_json_is_extracted() {
        let raw = "Here is the analysis:\n```json\n{\"overall_risk_score\": 72, \"risk_level\": \"high\"}\n```\nLet me know if you need more.";
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.overall_risk_score, 72);
        assert_eq!(verdict.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_unfenced_bare_json() {
        let verdict = parse_verdict(r#"{"overall_risk_score": 12, "risk_level": "low"}"#);
        assert_eq!(verdict.overall_risk_score, 12);
        assert_eq!(verdict.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_missing_keys_get_defaults() {
        let verdict = parse_verdict("{}");
        assert_eq!(verdict.overall_risk_score, 50);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
        assert_eq!(verdict.document_type, "Unknown Document");
        assert!(verdict.fraud_flags.is_empty());
        assert!(verdict.extracted_fields.is_empty());
    }

    #[test]
    fn test_flag_defaults() {
        let raw = r#"{"fraud_flags": [{}]}"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.fraud_flags.len(), 1);
        let flag = &verdict.fraud_flags[0];
        assert_eq!(flag.flag_type, "visual_forensics");
        assert_eq!(flag.name, "Unknown Issue");
        assert_eq!(flag.severity, Severity::Low);
        assert_eq!(flag.confidence, 50);
        assert!(flag.region_coords.is_none());
    }

    #[test]
    fn test_region_coords_parsed() {
        let raw = r#"{"fraud_flags": [{
            "name": "Cloned seal",
            "severity": "critical",
            "confidence": 91,
            "region_coords": {"x": 10.5, "y": 20.0, "width": 30.0, "height": 15.0}
        }]}"#;
        let verdict = parse_verdict(raw);
        let region = verdict.fraud_flags[0].region_coords.unwrap();
        assert_eq!(region.x, 10.5);
        assert_eq!(region.width, 30.0);
    }

    #[test]
    fn test_malformed_region_dropped_not_fatal() {
        let raw = r#"{"fraud_flags": [{"name": "X", "region_coords": "top left corner"}]}"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.fraud_flags.len(), 1);
        assert!(verdict.fraud_flags[0].region_coords.is_none());
    }

    #[test]
    fn test_empty_field_values_dropped() {
        let raw = r#"{"extracted_fields": [
            {"field_name": "name", "field_value": "Jane Doe", "confidence": 95},
            {"field_name": "id_number", "field_value": "", "confidence": 90},
            {"field_name": "issue_date", "field_value": null},
            {"field_name": "expiry_date"}
        ]}"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.extracted_fields.len(), 1);
        assert_eq!(verdict.extracted_fields[0].field_value, "Jane Doe");
    }

    #[test]
    fn test_field_confidence_default() {
        let raw = r#"{"extracted_fields": [{"field_name": "name", "field_value": "Jane"}]}"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.extracted_fields[0].confidence, 80);
    }

    #[test]
    fn test_out_of_range_score_clamped() {
        let verdict = parse_verdict(r#"{"overall_risk_score": 140}"#);
        assert_eq!(verdict.overall_risk_score, 100);
        let verdict = parse_verdict(r#"{"overall_risk_score": -3}"#);
        assert_eq!(verdict.overall_risk_score, 0);
    }

    #[test]
    fn test_unknown_risk_level_defaults_medium() {
        let verdict = parse_verdict(r#"{"risk_level": "catastrophic"}"#);
        assert_eq!(verdict.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_full_verdict() {
        let raw = r#"```json
        {
            "overall_risk_score": 72,
            "risk_level": "high",
            "document_type": "National ID Card",
            "ocr_text": "REPUBLIC OF EXAMPLE...",
            "fraud_flags": [
                {
                    "flag_type": "copy_move_detection",
                    "name": "Duplicated stamp",
                    "description": "The circular stamp appears twice with identical noise",
                    "severity": "high",
                    "confidence": 88,
                    "evidence_reference": "bottom right quadrant",
                    "page_number": 1,
                    "region_coords": {"x": 60, "y": 70, "width": 20, "height": 15}
                },
                {
                    "flag_type": "consistency_check",
                    "name": "Date logic error",
                    "description": "Issue date is after expiry date",
                    "severity": "medium",
                    "confidence": 95
                }
            ],
            "extracted_fields": [
                {"field_name": "full_name", "field_value": "Jane Doe", "confidence": 97}
            ],
            "passed_checks": ["Watermark present", "Font consistency"],
            "analysis_summary": "Multiple indicators of manipulation detected."
        }
        ```"#;
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.overall_risk_score, 72);
        assert_eq!(verdict.risk_level, RiskLevel::High);
        assert_eq!(verdict.fraud_flags.len(), 2);
        assert!(verdict.fraud_flags[0].region_coords.is_some());
        assert!(verdict.fraud_flags[1].region_coords.is_none());
        assert_eq!(verdict.extracted_fields.len(), 1);
        assert_eq!(verdict.passed_checks.len(), 2);
    }
}
