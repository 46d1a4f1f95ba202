//! crates/bookstore_core/src/parse.rs
//!
//! Recovers structured data from free-form completion text.
//!
//! Every function here is total: any input, including the empty string, yields a
//! fully-populated value. Malformed model output is absorbed into defaults and never
//! reaches the caller as an error.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Length of a hyphenated catalog identifier.
pub const ID_LEN: usize = 36;

const DEFAULT_ASSESSMENT_SUMMARY: &str = "An overall assessment of the book.";
const DEFAULT_TARGET_AUDIENCE: &str = "Suitable for readers interested in this topic.";
const DEFAULT_RATING: f64 = 4.0;
const FALLBACK_SUMMARY_CHARS: usize = 200;

const MAX_KEY_POINTS: usize = 5;
const SUMMARY_PREFIX_CHARS: usize = 300;
const PLACEHOLDER_KEY_POINTS: [&str; 3] = ["Useful content", "Easy to understand", "Practical"];

//=========================================================================================
// ID-list mode
//=========================================================================================

/// Keeps lines that are exactly one identifier, in order, without duplicates,
/// up to `limit` of them.
pub fn id_list(text: &str, limit: usize) -> Vec<Uuid> {
    let mut ids = Vec::new();
    for line in text.lines().map(str::trim) {
        if ids.len() == limit {
            break;
        }
        if line.len() != ID_LEN {
            continue;
        }
        if let Ok(id) = Uuid::parse_str(line) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

//=========================================================================================
// JSON-object mode
//=========================================================================================

/// A model-written assessment of a book. `rating` is a continuous 0-5 score and is
/// unrelated to customer review ratings.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookAssessment {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub target_audience: String,
    pub rating: f64,
}

impl BookAssessment {
    /// Used when no JSON object could be recovered at all.
    fn unparsed(text: &str) -> Self {
        let prefix: String = text.chars().take(FALLBACK_SUMMARY_CHARS).collect();
        Self {
            summary: if prefix.trim().is_empty() {
                DEFAULT_ASSESSMENT_SUMMARY.to_string()
            } else {
                prefix
            },
            strengths: vec!["Useful content".to_string(), "Easy to follow".to_string()],
            weaknesses: vec!["Some sections could be improved".to_string()],
            target_audience: DEFAULT_TARGET_AUDIENCE.to_string(),
            rating: DEFAULT_RATING,
        }
    }

    fn from_object(object: &serde_json::Map<String, Value>) -> Self {
        Self {
            summary: non_empty_string(object.get("summary"))
                .unwrap_or_else(|| DEFAULT_ASSESSMENT_SUMMARY.to_string()),
            strengths: string_list(object.get("strengths")),
            weaknesses: string_list(object.get("weaknesses")),
            target_audience: non_empty_string(object.get("targetAudience"))
                .unwrap_or_else(|| DEFAULT_TARGET_AUDIENCE.to_string()),
            rating: object
                .get("rating")
                .and_then(Value::as_f64)
                .filter(|r| (0.0..=5.0).contains(r))
                .unwrap_or(DEFAULT_RATING),
        }
    }
}

/// Parses the first `{ ... }` span of `text`, defaulting every missing or invalid field.
pub fn assessment(text: &str) -> BookAssessment {
    let object = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Value>(&text[start..=end]).ok()
        }
        _ => None,
    };
    match object {
        Some(Value::Object(map)) => BookAssessment::from_object(&map),
        _ => BookAssessment::unparsed(text),
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

//=========================================================================================
// Labeled-section mode
//=========================================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SectionedSummary {
    pub summary: String,
    /// Never empty: either up to five parsed points or the placeholder list.
    pub key_points: Vec<String>,
}

fn summary_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^[#*\s]*summary(?:[*:]+|[^\S\n]*$)").expect("valid regex"))
}

fn key_points_marker() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?im)^[#*\s]*key\s+points(?:[*:]+|[^\S\n]*$)").expect("valid regex"))
}

fn enumerated_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\.\s*(.+)$").expect("valid regex"))
}

/// Splits a "SUMMARY: ... KEY POINTS: 1. ..." answer into its two parts.
pub fn sectioned_summary(text: &str) -> SectionedSummary {
    let key_marker = key_points_marker().find(text);

    let summary = match summary_marker().find(text) {
        Some(summary) => {
            let end = key_points_marker()
                .find_at(text, summary.end())
                .map_or(text.len(), |m| m.start());
            strip_markup(&text[summary.end()..end])
        }
        None => match key_marker {
            Some(key) => strip_markup(&text[..key.start()]),
            None => text.chars().take(SUMMARY_PREFIX_CHARS).collect::<String>().trim().to_string(),
        },
    };

    let points_section = key_marker.map_or(text, |m| &text[m.end()..]);
    let mut key_points: Vec<String> = points_section
        .lines()
        .filter_map(|line| enumerated_line().captures(line.trim()))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|point| !point.is_empty())
        .take(MAX_KEY_POINTS)
        .collect();

    if key_points.is_empty() {
        key_points = PLACEHOLDER_KEY_POINTS.iter().map(|p| p.to_string()).collect();
    }

    SectionedSummary {
        summary,
        key_points,
    }
}

/// Trims whitespace and the markdown emphasis left around section labels.
fn strip_markup(section: &str) -> String {
    section
        .trim_matches(|c: char| c.is_whitespace() || c == '*' || c == '#')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_keeps_only_identifier_lines() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let text = format!("Here you go:\n  {a}  \nnot-an-id\n{b}\n{a}\n");
        assert_eq!(id_list(&text, 5), vec![a, b]);
    }

    #[test]
    fn id_list_caps_to_limit() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let text = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join("\n");
        assert_eq!(id_list(&text, 2), ids[..2].to_vec());
    }

    #[test]
    fn id_list_rejects_right_length_garbage() {
        let fake = "z".repeat(ID_LEN);
        assert!(id_list(&fake, 3).is_empty());
        assert!(id_list("", 3).is_empty());
    }

    #[test]
    fn assessment_reads_embedded_json() {
        let text = r#"Sure! {"summary":"Great read","strengths":["clear"],"weaknesses":[],"targetAudience":"Students","rating":4.5} Hope this helps."#;
        let parsed = assessment(text);
        assert_eq!(parsed.summary, "Great read");
        assert_eq!(parsed.strengths, vec!["clear"]);
        assert!(parsed.weaknesses.is_empty());
        assert_eq!(parsed.target_audience, "Students");
        assert_eq!(parsed.rating, 4.5);
    }

    #[test]
    fn assessment_defaults_invalid_fields() {
        let parsed = assessment(r#"{"strengths":"many","weaknesses":null,"rating":9}"#);
        assert_eq!(parsed.summary, DEFAULT_ASSESSMENT_SUMMARY);
        assert!(parsed.strengths.is_empty());
        assert!(parsed.weaknesses.is_empty());
        assert_eq!(parsed.rating, DEFAULT_RATING);

        let parsed = assessment(r#"{"summary":"ok","rating":"five"}"#);
        assert_eq!(parsed.rating, DEFAULT_RATING);
    }

    #[test]
    fn assessment_is_total_for_junk_and_empty_input() {
        for text in ["", "no json here", "{ broken", "} backwards {", "{\"a\": [}"] {
            let parsed = assessment(text);
            assert!((0.0..=5.0).contains(&parsed.rating));
            assert!(!parsed.summary.is_empty());
            assert!(!parsed.target_audience.is_empty());
        }
        assert_eq!(assessment("").summary, DEFAULT_ASSESSMENT_SUMMARY);
        assert_eq!(assessment("plain words").summary, "plain words");
    }

    #[test]
    fn sectioned_summary_reads_both_sections() {
        let text = "SUMMARY:\nA tale of two cities.\n\nKEY POINTS:\n1. Revolution\n2. Sacrifice\n3. Love";
        let parsed = sectioned_summary(text);
        assert_eq!(parsed.summary, "A tale of two cities.");
        assert_eq!(parsed.key_points, vec!["Revolution", "Sacrifice", "Love"]);
    }

    #[test]
    fn sectioned_summary_is_case_insensitive_and_caps_points() {
        let text = "**Summary:** Short.\nKey Points:\n1. a\n2. b\n3. c\n4. d\n5. e\n6. f";
        let parsed = sectioned_summary(text);
        assert_eq!(parsed.summary, "Short.");
        assert_eq!(parsed.key_points.len(), MAX_KEY_POINTS);
    }

    #[test]
    fn section_labels_must_start_a_line() {
        let text = "Here is a summary of the book.\nSUMMARY:\nActual summary.\n\n## Key Points\n1. a\n2. b";
        let parsed = sectioned_summary(text);
        assert_eq!(parsed.summary, "Actual summary.");
        assert_eq!(parsed.key_points, vec!["a", "b"]);

        let prose = "Here is a summary touching on the key points of the plot.\n1. a";
        let parsed = sectioned_summary(prose);
        assert!(parsed.summary.starts_with("Here is a summary touching"));
        assert_eq!(parsed.key_points, vec!["a"]);
    }

    #[test]
    fn sectioned_summary_without_summary_marker_uses_text_before_points() {
        let parsed = sectioned_summary("Intro text.\nKEY POINTS:\n1. one");
        assert_eq!(parsed.summary, "Intro text.");
        assert_eq!(parsed.key_points, vec!["one"]);
    }

    #[test]
    fn sectioned_summary_without_markers_uses_prefix_and_placeholders() {
        let text = "w".repeat(1000);
        let parsed = sectioned_summary(&text);
        assert_eq!(parsed.summary.len(), SUMMARY_PREFIX_CHARS);
        assert_eq!(parsed.key_points, PLACEHOLDER_KEY_POINTS.to_vec());

        let parsed = sectioned_summary("");
        assert_eq!(parsed.summary, "");
        assert_eq!(parsed.key_points.len(), 3);
    }
}
