//! Response normalisation.
//!
//! Turns whatever text a backend returned into a complete [`AnalysisRecord`]. Recovery runs in
//! a fixed order and stops at the first stage that yields a JSON object:
//!
//! 1. **Direct parse** of the whole text.
//! 2. **Embedded object**: the span from the first `{` to the last `}`.
//! 3. **Field by field**: per-key regular expressions over the raw text, with fenced code
//!    blocks collected as code examples.
//!
//! Shape repair then fills every missing, empty or mis-shaped field, so normalisation never
//! fails: the worst case is the all-placeholder record.

use crate::constants::{
    GENERIC_CODE_EXPLANATION, KEY_CODE, KEY_CODE_EXAMPLES, KEY_EXPLANATION, KEY_IMPROVEMENT_AREAS,
    KEY_OVERALL_ASSESSMENT, KEY_PERFORMANCE, KEY_PURPOSE, KEY_SECURITY, KEY_STRENGTHS,
    KEY_SUMMARY, KEY_TECHNOLOGIES, LIST_KEYS, PLACEHOLDER, SCALAR_KEYS,
};
use crate::record::{placeholder_list, placeholder_text, AnalysisRecord, CodeExample};
use critique_types::NonEmptyText;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

type JsonMap = Map<String, Value>;

/// Which recovery stage produced the object that was repaired.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStage {
    Direct,
    Embedded,
    FieldByField,
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecoveryStage::Direct => "direct parse",
            RecoveryStage::Embedded => "embedded object",
            RecoveryStage::FieldByField => "field-by-field extraction",
        })
    }
}

static SCALAR_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SCALAR_KEYS
        .iter()
        .map(|key| {
            let pattern = format!(r#""{}"\s*:\s*"((?:[^"\\]|\\.)*)""#, regex::escape(key));
            (*key, Regex::new(&pattern).expect("scalar field pattern is valid"))
        })
        .collect()
});

static LIST_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    LIST_KEYS
        .iter()
        .map(|key| {
            let pattern = format!(r#""{}"\s*:\s*\[([^\]]*)\]"#, regex::escape(key));
            (*key, Regex::new(&pattern).expect("list field pattern is valid"))
        })
        .collect()
});

static QUOTED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("quoted item pattern is valid"));

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("fenced block pattern is valid")
});

/// Stateless normaliser; cheap to construct and safe to share between tasks.
#[derive(Debug, Clone, Default)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalises raw backend text into a complete record. Never fails.
    pub fn normalize(&self, raw: &str) -> AnalysisRecord {
        self.normalize_with_stage(raw).0
    }

    /// Like [`normalize`](Self::normalize), also reporting which stage recovered the object.
    pub fn normalize_with_stage(&self, raw: &str) -> (AnalysisRecord, RecoveryStage) {
        let (map, stage) = if let Some(map) = parse_object(raw) {
            (map, RecoveryStage::Direct)
        } else if let Some(map) = extract_embedded_object(raw) {
            (map, RecoveryStage::Embedded)
        } else {
            tracing::warn!(
                "backend response is not JSON ({} chars); falling back to field extraction",
                raw.len()
            );
            (extract_fields(raw), RecoveryStage::FieldByField)
        };

        tracing::debug!("normalised backend response via {}", stage);
        (repair(&map), stage)
    }
}

/// Convenience wrapper around [`ResponseNormalizer::normalize`].
pub fn normalize(raw: &str) -> AnalysisRecord {
    ResponseNormalizer::new().normalize(raw)
}

fn parse_object(text: &str) -> Option<JsonMap> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn extract_embedded_object(text: &str) -> Option<JsonMap> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    parse_object(&text[start..=end])
}

/// Decodes the body of a JSON string literal, keeping the raw text if it is not valid JSON.
fn unescape_json_string(body: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", body)).unwrap_or_else(|_| body.to_string())
}

fn extract_fields(text: &str) -> JsonMap {
    let mut map = JsonMap::new();

    for (key, re) in SCALAR_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            map.insert(
                (*key).to_string(),
                Value::String(unescape_json_string(&caps[1])),
            );
        }
    }

    for (key, re) in LIST_PATTERNS.iter() {
        if let Some(caps) = re.captures(text) {
            let items = QUOTED_ITEM
                .captures_iter(&caps[1])
                .map(|item| Value::String(unescape_json_string(&item[1])))
                .collect();
            map.insert((*key).to_string(), Value::Array(items));
        }
    }

    let blocks: Vec<Value> = FENCED_BLOCK
        .captures_iter(text)
        .map(|caps| caps[1].trim_end_matches('\n').to_string())
        .filter(|code| !code.trim().is_empty())
        .map(Value::String)
        .collect();
    if !blocks.is_empty() {
        map.insert(KEY_CODE_EXAMPLES.to_string(), Value::Array(blocks));
    }

    map
}

/// True for values Python would treat as false, plus whitespace-only strings.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Text form of a value; strings are taken verbatim.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Object(_) => Some(value.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_text).collect();
            Some(parts.join(", "))
        }
    }
}

fn present<'a>(map: &'a JsonMap, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|value| !is_falsy(value))
}

fn repair_scalar(map: &JsonMap, key: &str) -> NonEmptyText {
    present(map, key)
        .and_then(value_text)
        .and_then(|text| NonEmptyText::try_from(text).ok())
        .unwrap_or_else(placeholder_text)
}

fn repair_list(map: &JsonMap, key: &str) -> Vec<NonEmptyText> {
    let items: Vec<NonEmptyText> = match present(map, key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(value_text)
            .filter_map(|text| NonEmptyText::try_from(text).ok())
            .collect(),
        Some(other) => value_text(other)
            .and_then(|text| NonEmptyText::try_from(text).ok())
            .into_iter()
            .collect(),
        None => Vec::new(),
    };

    if items.is_empty() {
        placeholder_list()
    } else {
        items
    }
}

/// Text of a sub-field, or `None` when it is falsy or renders blank.
fn present_text(value: &Value) -> Option<String> {
    if is_falsy(value) {
        return None;
    }
    value_text(value).filter(|text| !text.trim().is_empty())
}

fn repair_code_example(item: &Value) -> Option<CodeExample> {
    match item {
        Value::Object(fields)
            if fields.contains_key(KEY_EXPLANATION) && fields.contains_key(KEY_CODE) =>
        {
            let explanation = present_text(&fields[KEY_EXPLANATION]);
            let code = present_text(&fields[KEY_CODE]);
            match (explanation, code) {
                (None, None) => None,
                (explanation, code) => Some(CodeExample::new(
                    explanation.unwrap_or_else(|| GENERIC_CODE_EXPLANATION.to_string()),
                    code.unwrap_or_else(|| PLACEHOLDER.to_string()),
                )),
            }
        }
        Value::String(code) if !code.trim().is_empty() => Some(CodeExample::from_code(code.clone())),
        _ => None,
    }
}

fn repair_code_examples(map: &JsonMap) -> Vec<CodeExample> {
    let examples: Vec<CodeExample> = match present(map, KEY_CODE_EXAMPLES) {
        Some(Value::Array(items)) => items.iter().filter_map(repair_code_example).collect(),
        _ => Vec::new(),
    };

    if examples.is_empty() {
        vec![CodeExample::placeholder()]
    } else {
        examples
    }
}

fn repair(map: &JsonMap) -> AnalysisRecord {
    AnalysisRecord {
        purpose: repair_scalar(map, KEY_PURPOSE),
        summary: repair_scalar(map, KEY_SUMMARY),
        technologies: repair_list(map, KEY_TECHNOLOGIES),
        overall_assessment: repair_scalar(map, KEY_OVERALL_ASSESSMENT),
        strengths: repair_list(map, KEY_STRENGTHS),
        improvement_areas: repair_list(map, KEY_IMPROVEMENT_AREAS),
        code_examples: repair_code_examples(map),
        security_recommendations: repair_list(map, KEY_SECURITY),
        performance_recommendations: repair_list(map, KEY_PERFORMANCE),
    }
}
