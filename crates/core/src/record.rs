//! The canonical analysis record.
//!
//! An [`AnalysisRecord`] is what the normalizer hands to the renderer. Every field is present
//! and non-empty; serialisation uses the backend's literal key names so that a record can be
//! fed back through the normalizer unchanged.

use crate::constants::{GENERIC_CODE_EXPLANATION, PLACEHOLDER};
use critique_types::NonEmptyText;
use serde::{Deserialize, Serialize};

/// A suggested change: why, and what the code would look like.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(rename = "aciklama")]
    pub explanation: String,
    #[serde(rename = "kod")]
    pub code: String,
}

impl CodeExample {
    pub fn new(explanation: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            explanation: explanation.into(),
            code: code.into(),
        }
    }

    /// Wraps a bare code string with the generic explanation.
    pub fn from_code(code: impl Into<String>) -> Self {
        Self::new(GENERIC_CODE_EXPLANATION, code)
    }

    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, PLACEHOLDER)
    }

    pub fn is_complete(&self) -> bool {
        !self.explanation.trim().is_empty() && !self.code.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "proje_amaci")]
    pub purpose: NonEmptyText,
    #[serde(rename = "proje_ozeti")]
    pub summary: NonEmptyText,
    #[serde(rename = "kullanilan_teknolojiler")]
    pub technologies: Vec<NonEmptyText>,
    #[serde(rename = "genel_degerlendirme")]
    pub overall_assessment: NonEmptyText,
    #[serde(rename = "guclu_yonler")]
    pub strengths: Vec<NonEmptyText>,
    #[serde(rename = "iyilestirme_alanlari")]
    pub improvement_areas: Vec<NonEmptyText>,
    #[serde(rename = "kod_ornekleri")]
    pub code_examples: Vec<CodeExample>,
    #[serde(rename = "guvenlik_onerileri")]
    pub security_recommendations: Vec<NonEmptyText>,
    #[serde(rename = "performans_onerileri")]
    pub performance_recommendations: Vec<NonEmptyText>,
}

/// The placeholder as a validated text value.
pub fn placeholder_text() -> NonEmptyText {
    NonEmptyText::new(PLACEHOLDER).expect("placeholder constant is not blank")
}

/// A one-element list holding the placeholder.
pub fn placeholder_list() -> Vec<NonEmptyText> {
    vec![placeholder_text()]
}

impl AnalysisRecord {
    /// The record produced when nothing could be recovered.
    pub fn placeholder() -> Self {
        Self {
            purpose: placeholder_text(),
            summary: placeholder_text(),
            technologies: placeholder_list(),
            overall_assessment: placeholder_text(),
            strengths: placeholder_list(),
            improvement_areas: placeholder_list(),
            code_examples: vec![CodeExample::placeholder()],
            security_recommendations: placeholder_list(),
            performance_recommendations: placeholder_list(),
        }
    }

    /// The placeholder record with a note about why analysis failed in the summary.
    pub fn placeholder_with_note(note: &str) -> Self {
        let mut record = Self::placeholder();
        if let Ok(summary) = NonEmptyText::new(note) {
            record.summary = summary;
        }
        record
    }

    /// True if every field, every list and every code example is populated.
    pub fn is_complete(&self) -> bool {
        !self.technologies.is_empty()
            && !self.strengths.is_empty()
            && !self.improvement_areas.is_empty()
            && !self.code_examples.is_empty()
            && self.code_examples.iter().all(CodeExample::is_complete)
            && !self.security_recommendations.is_empty()
            && !self.performance_recommendations.is_empty()
    }

    /// Serialises the record with the backend's key names.
    pub fn to_wire_json(&self) -> crate::CritiqueResult<String> {
        serde_json::to_string_pretty(self).map_err(crate::CritiqueError::Serialization)
    }
}
