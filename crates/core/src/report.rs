//! Markdown rendering of a canonical analysis record.
//!
//! The renderer is total over [`AnalysisRecord`]: it never inspects a field for absence, since
//! the normalizer guarantees every field is populated.

use crate::record::{AnalysisRecord, CodeExample};
use critique_types::NonEmptyText;
use once_cell::sync::Lazy;
use regex::RegexSet;

/// Report title.
const REPORT_HEADER: &str = "# Code Analysis Report";

const CODE_FENCE: &str = "```";

/// Syntactic signatures that mark a snippet as source code.
static CODE_SIGNATURES: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        // function / class definitions
        r"(?m)^\s*(async\s+)?def\s+\w+\s*\(",
        r"(?m)^\s*class\s+\w+\s*[(:]",
        // imports
        r"(?m)^\s*import\s+[\w.]+",
        r"(?m)^\s*from\s+[\w.]+\s+import\s+\S",
        // assignments, including augmented and subscript targets
        r"(?m)^\s*[A-Za-z_][\w.]*(\[[^\]\n]*\])?\s*(\+|-|\*|/|//|%|\|)?=[^=]",
        // control-flow headers
        r"(?m)^\s*(if|elif|else|for|while|try|except|finally|with)\b[^\n]*:\s*$",
        // entry-point guard
        r#"if\s+__name__\s*==\s*['"]__main__['"]"#,
    ])
    .expect("code signature patterns are valid")
});

/// Renders analysis records as markdown documents.
#[derive(Debug, Clone, Default)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Renders the record with one heading per field, in a fixed order.
    pub fn render(&self, record: &AnalysisRecord) -> String {
        let mut out: Vec<String> = Vec::new();
        out.push(format!("{}\n", REPORT_HEADER));

        push_text(&mut out, "Project Purpose", &record.purpose);
        push_text(&mut out, "Project Summary", &record.summary);
        push_bullets(&mut out, "Technologies Used", &record.technologies);
        push_text(&mut out, "Overall Assessment", &record.overall_assessment);
        push_bullets(&mut out, "Strengths", &record.strengths);
        push_bullets(&mut out, "Areas for Improvement", &record.improvement_areas);
        push_code_examples(&mut out, &record.code_examples);
        push_bullets(
            &mut out,
            "Security Recommendations",
            &record.security_recommendations,
        );
        push_bullets(
            &mut out,
            "Performance Recommendations",
            &record.performance_recommendations,
        );

        out.join("\n").trim_end().to_string()
    }
}

fn push_text(out: &mut Vec<String>, heading: &str, text: &NonEmptyText) {
    out.push(format!("## {}", heading));
    out.push(text.as_str().to_string());
    out.push(String::new());
}

fn push_bullets(out: &mut Vec<String>, heading: &str, items: &[NonEmptyText]) {
    out.push(format!("## {}", heading));
    for item in items {
        out.push(format!("* {}", item));
    }
    out.push(String::new());
}

fn push_code_examples(out: &mut Vec<String>, examples: &[CodeExample]) {
    out.push("## Code Examples and Suggestions".to_string());
    for example in examples {
        out.push("### Explanation".to_string());
        out.push(example.explanation.clone());
        out.push(String::new());
        out.push("### Code".to_string());
        out.push(format_code_block(&example.code));
        out.push(String::new());
    }
}

/// True if `text` matches at least one code signature.
pub fn looks_like_code(text: &str) -> bool {
    CODE_SIGNATURES.is_match(text)
}

/// Wraps unfenced code in a fenced block with indentation normalised to the first line.
///
/// Text that already contains fence markers, or that does not look like code, is returned
/// unchanged.
pub fn format_code_block(text: &str) -> String {
    if text.contains(CODE_FENCE) || !looks_like_code(text) {
        return text.to_string();
    }

    format!(
        "{}python\n{}\n{}",
        CODE_FENCE,
        normalize_indentation(text),
        CODE_FENCE
    )
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Removes the first non-blank line's indentation from every line.
///
/// Lines indented less than that width are fully left-trimmed.
fn normalize_indentation(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let width = lines
        .iter()
        .find(|line| !line.trim().is_empty())
        .map(|line| leading_spaces(line))
        .unwrap_or(0);

    let normalized: Vec<&str> = lines
        .iter()
        .map(|line| {
            if leading_spaces(line) >= width {
                &line[width..]
            } else {
                line.trim_start()
            }
        })
        .collect();

    normalized
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PLACEHOLDER;

    #[test]
    fn test_placeholder_report_has_all_headings_in_order() {
        let report = ReportRenderer::new().render(&AnalysisRecord::placeholder());

        let headings = [
            "## Project Purpose",
            "## Project Summary",
            "## Technologies Used",
            "## Overall Assessment",
            "## Strengths",
            "## Areas for Improvement",
            "## Code Examples and Suggestions",
            "## Security Recommendations",
            "## Performance Recommendations",
        ];
        let mut last = 0;
        for heading in headings {
            let pos = report[last..]
                .find(heading)
                .map(|p| p + last)
                .unwrap_or_else(|| panic!("{heading} missing or out of order"));
            last = pos + heading.len();
        }

        assert!(report.starts_with("# Code Analysis Report\n"));
        assert!(report.contains(&format!("## Project Purpose\n{}\n", PLACEHOLDER)));
        assert!(report.contains(&format!("## Strengths\n* {}\n", PLACEHOLDER)));
        assert!(report.ends_with(&format!(
            "## Performance Recommendations\n* {}",
            PLACEHOLDER
        )));
    }

    #[test]
    fn test_code_example_rendered_with_subheadings() {
        let mut record = AnalysisRecord::placeholder();
        record.code_examples = vec![CodeExample::new(
            "Guard the entry point",
            "if __name__ == \"__main__\":\n    main()",
        )];

        let report = ReportRenderer::new().render(&record);
        assert!(report.contains(
            "### Explanation\nGuard the entry point\n\n### Code\n```python\nif __name__ == \"__main__\":\n    main()\n```"
        ));
    }

    #[test]
    fn test_unfenced_function_is_wrapped_and_dedented() {
        let formatted = format_code_block("def f():\n    return 1");
        assert_eq!(formatted, "```python\ndef f():\n    return 1\n```");

        let indented = format_code_block("    def f():\n        return 1");
        assert_eq!(indented, "```python\ndef f():\n    return 1\n```");
    }

    #[test]
    fn test_lines_shorter_than_indent_are_left_trimmed() {
        let formatted = format_code_block("    x = 1\n  y = 2\n\n    z = 3");
        assert_eq!(formatted, "```python\nx = 1\ny = 2\n\nz = 3\n```");
    }

    #[test]
    fn test_already_fenced_text_is_unchanged() {
        let text = "```python\nimport os\n```";
        assert_eq!(format_code_block(text), text);
    }

    #[test]
    fn test_prose_is_unchanged() {
        let text = "Consider splitting the training loop into smaller functions.";
        assert!(!looks_like_code(text));
        assert_eq!(format_code_block(text), text);
        assert_eq!(format_code_block(PLACEHOLDER), PLACEHOLDER);
    }

    #[test]
    fn test_code_signatures() {
        assert!(looks_like_code("import numpy as np"));
        assert!(looks_like_code("from pathlib import Path"));
        assert!(looks_like_code("class Model(nn.Module):\n    pass"));
        assert!(looks_like_code("total += value"));
        assert!(looks_like_code("config['lr'] = 0.01"));
        assert!(looks_like_code("for item in items:\n    print(item)"));
        assert!(looks_like_code("with open(p) as fh:"));
        assert!(looks_like_code("async def fetch(url):"));
        assert!(!looks_like_code("a == b is a comparison"));
        assert!(!looks_like_code("Use type hints: they help readers."));
    }

    #[test]
    fn test_bullets_keep_order_and_duplicates() {
        let mut record = AnalysisRecord::placeholder();
        record.technologies = ["Flask", "SQLite", "Flask"]
            .into_iter()
            .map(|t| NonEmptyText::new(t).unwrap())
            .collect();

        let report = ReportRenderer::new().render(&record);
        assert!(report.contains("## Technologies Used\n* Flask\n* SQLite\n* Flask\n"));
    }
}
