//! Prompt assembly for analysis and follow-up chat requests.

use crate::source::DocumentationDigest;

/// Fixed system instruction for analysis requests.
///
/// Names every field of the analysis record with the exact key the normalizer looks for.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a senior Python developer reviewing a project. Analyse the given code against the criteria below and answer with JSON ONLY. All explanations belong inside the JSON; write no text before or after it.

The response must have exactly this shape, and every field must be filled in:
{
    "proje_amaci": "Short description of the project's main purpose",
    "proje_ozeti": "Short summary of how the project works",
    "kullanilan_teknolojiler": ["Technology 1", "Technology 2"],
    "genel_degerlendirme": "Short overall assessment of code quality",
    "guclu_yonler": ["Strength 1", "Strength 2"],
    "iyilestirme_alanlari": ["Improvement 1", "Improvement 2"],
    "kod_ornekleri": [
        {"aciklama": "What the change improves", "kod": "runnable example code"}
    ],
    "guvenlik_onerileri": ["Security recommendation 1", "Security recommendation 2"],
    "performans_onerileri": ["Performance recommendation 1", "Performance recommendation 2"]
}

Analyse:
1. Project: purpose and scope, core technologies and libraries, a short summary.
2. Code quality: readability, maintainability, adherence to best practices and PEP 8.
3. Potential improvements: performance, code organisation, error handling, security.
4. Recommendations: concrete improvements, each "kod" value being realistic, runnable-looking source code (not a description of code), modern Python features, alternative approaches."#;

/// Fixed system instruction for follow-up questions.
pub const CHAT_SYSTEM_PROMPT: &str =
    "You are a code analysis assistant. Answer the user's questions about their project.";

/// The two instructions sent to a backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptPayload {
    pub system: String,
    pub user: String,
}

/// Builds request payloads. Holds only immutable templates.
#[derive(Clone, Debug)]
pub struct PromptBuilder {
    system_template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self {
            system_template: ANALYSIS_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_template(system_template: impl Into<String>) -> Self {
        Self {
            system_template: system_template.into(),
        }
    }

    /// Builds the analysis payload for `source_text`.
    ///
    /// When the digest has at least one non-empty section, the user instruction starts with a
    /// documentation block listing only the populated sections, in the order description, usage
    /// examples, parameters, notes.
    pub fn build(&self, source_text: &str, digest: Option<&DocumentationDigest>) -> PromptPayload {
        let mut user = String::new();

        if let Some(block) = digest.and_then(documentation_block) {
            user.push_str(&block);
            user.push_str("\n\n");
        }

        user.push_str("Please analyse this Python code:\n\n");
        user.push_str(source_text);

        PromptPayload {
            system: self.system_template.clone(),
            user,
        }
    }

    /// Builds a follow-up question payload about previously analysed code.
    pub fn build_chat(&self, source_text: &str, question: &str) -> PromptPayload {
        PromptPayload {
            system: CHAT_SYSTEM_PROMPT.to_string(),
            user: format!("Project code:\n{}\n\nQuestion: {}", source_text, question),
        }
    }
}

fn documentation_block(digest: &DocumentationDigest) -> Option<String> {
    let sections: Vec<String> = digest
        .sections()
        .into_iter()
        .filter(|(_, body)| !body.trim().is_empty())
        .map(|(heading, body)| format!("### {}\n{}", heading, body.trim()))
        .collect();

    if sections.is_empty() {
        return None;
    }

    Some(format!("## Project Documentation\n\n{}", sections.join("\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_without_digest_embeds_source() {
        let payload = PromptBuilder::new().build("print('hi')", None);
        assert_eq!(payload.system, ANALYSIS_SYSTEM_PROMPT);
        assert!(payload.user.starts_with("Please analyse this Python code:"));
        assert!(payload.user.ends_with("print('hi')"));
    }

    #[test]
    fn test_system_prompt_names_every_key() {
        for key in crate::constants::SCALAR_KEYS
            .iter()
            .chain(crate::constants::LIST_KEYS.iter())
            .chain(["kod_ornekleri", "aciklama", "kod"].iter())
        {
            assert!(
                ANALYSIS_SYSTEM_PROMPT.contains(&format!("\"{}\"", key)),
                "prompt is missing {key}"
            );
        }
        assert!(ANALYSIS_SYSTEM_PROMPT.contains("JSON ONLY"));
    }

    #[test]
    fn test_digest_sections_in_fixed_order_without_empty_headings() {
        let digest = DocumentationDigest {
            description: "Classifies fish species.".into(),
            usage_examples: String::new(),
            parameters: "epochs: number of passes".into(),
            notes: "Needs a GPU.".into(),
        };
        let payload = PromptBuilder::new().build("x = 1", Some(&digest));

        let doc_pos = payload.user.find("## Project Documentation").unwrap();
        let desc_pos = payload.user.find("### Description").unwrap();
        let param_pos = payload.user.find("### Parameters").unwrap();
        let notes_pos = payload.user.find("### Notes").unwrap();
        let code_pos = payload.user.find("Please analyse").unwrap();

        assert!(doc_pos < desc_pos && desc_pos < param_pos && param_pos < notes_pos);
        assert!(notes_pos < code_pos);
        assert!(!payload.user.contains("### Usage Examples"));
    }

    #[test]
    fn test_empty_digest_adds_no_block() {
        let digest = DocumentationDigest::default();
        let payload = PromptBuilder::new().build("x = 1", Some(&digest));
        assert!(!payload.user.contains("Project Documentation"));
        assert_eq!(payload, PromptBuilder::new().build("x = 1", None));
    }

    #[test]
    fn test_build_chat_contains_code_and_question() {
        let payload = PromptBuilder::new().build_chat("def f(): pass", "What does f do?");
        assert_eq!(payload.system, CHAT_SYSTEM_PROMPT);
        assert!(payload.user.contains("def f(): pass"));
        assert!(payload.user.ends_with("Question: What does f do?"));
    }

    #[test]
    fn test_custom_template_is_used() {
        let payload = PromptBuilder::with_system_template("custom").build("x", None);
        assert_eq!(payload.system, "custom");
    }
}
