use crate::{CritiqueError, CritiqueResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Documentation extracted from a notebook's markdown cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentationDigest {
    pub description: String,
    pub usage_examples: String,
    pub parameters: String,
    pub notes: String,
}

impl DocumentationDigest {
    /// `(heading, body)` pairs in prompt order.
    pub fn sections(&self) -> Vec<(&str, &str)> {
        vec![
            ("Description", self.description.as_str()),
            ("Usage Examples", self.usage_examples.as_str()),
            ("Parameters", self.parameters.as_str()),
            ("Notes", self.notes.as_str()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.sections()
            .iter()
            .all(|(_, body)| body.trim().is_empty())
    }

    fn section_mut(&mut self, section: Section) -> &mut String {
        match section {
            Section::Description => &mut self.description,
            Section::Usage => &mut self.usage_examples,
            Section::Parameters => &mut self.parameters,
            Section::Notes => &mut self.notes,
        }
    }

    fn push(&mut self, section: Section, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let body = self.section_mut(section);
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(text);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
    Description,
    Usage,
    Parameters,
    Notes,
}

// Whole-word matches, so "Notebook" is not a note and "Setting up" is not a setting.
static USAGE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(usages?|examples?|how to|kullanım\w*|örne\w*)\b")
        .expect("usage heading pattern is valid")
});
static PARAMETER_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(parameters?|arguments?|configuration|config|settings|parametre\w*|ayar\w*)\b")
        .expect("parameter heading pattern is valid")
});
static NOTES_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(notes?|notlar\w*|caveats?|limitations?)\b")
        .expect("notes heading pattern is valid")
});

impl Section {
    fn from_heading(heading: &str) -> Self {
        if USAGE_HEADING.is_match(heading) {
            Section::Usage
        } else if PARAMETER_HEADING.is_match(heading) {
            Section::Parameters
        } else if NOTES_HEADING.is_match(heading) {
            Section::Notes
        } else {
            Section::Description
        }
    }
}

/// A notebook cell reduced to what extraction needs.
struct Cell {
    kind: String,
    text: String,
}

/// Extracts the code and documentation digest from notebook JSON.
///
/// Code cells are concatenated in order, each followed by a blank line. Markdown cells are
/// sorted into digest sections by their first heading; a cell without a heading continues
/// the section of the cell before it.
///
/// Accepts nbformat 4 (top-level `cells`) and nbformat 3 (`worksheets[].cells`).
///
/// # Errors
///
/// Returns [`CritiqueError::NotebookParse`] if the content is not JSON or has no cell list.
pub fn extract_notebook(raw: &str) -> CritiqueResult<(String, DocumentationDigest)> {
    let notebook: Value =
        serde_json::from_str(raw).map_err(|e| CritiqueError::NotebookParse(e.to_string()))?;

    let cells = read_cells(&notebook)?;

    let mut code = String::new();
    let mut digest = DocumentationDigest::default();
    let mut section = Section::Description;

    for cell in cells {
        match cell.kind.as_str() {
            "code" => {
                code.push_str(&cell.text);
                code.push_str("\n\n");
            }
            "markdown" => {
                if let Some(heading) = first_heading(&cell.text) {
                    section = Section::from_heading(heading);
                }
                digest.push(section, &cell.text);
            }
            _ => {}
        }
    }

    Ok((code, digest))
}

fn read_cells(notebook: &Value) -> CritiqueResult<Vec<Cell>> {
    if let Some(cells) = notebook.get("cells").and_then(Value::as_array) {
        return Ok(cells.iter().map(v4_cell).collect());
    }

    if let Some(worksheets) = notebook.get("worksheets").and_then(Value::as_array) {
        return Ok(worksheets
            .iter()
            .filter_map(|ws| ws.get("cells").and_then(Value::as_array))
            .flatten()
            .map(v3_cell)
            .collect());
    }

    Err(CritiqueError::NotebookParse(
        "document has neither 'cells' nor 'worksheets'".into(),
    ))
}

fn cell_type(cell: &Value) -> &str {
    cell.get("cell_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn v4_cell(cell: &Value) -> Cell {
    Cell {
        kind: cell_type(cell).to_string(),
        text: source_text(cell.get("source")),
    }
}

fn v3_cell(cell: &Value) -> Cell {
    match cell_type(cell) {
        "code" => Cell {
            kind: "code".into(),
            text: source_text(cell.get("input")),
        },
        // nbformat 3 keeps headings in their own cell type.
        "heading" => {
            let level = cell
                .get("level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6) as usize;
            Cell {
                kind: "markdown".into(),
                text: format!("{} {}", "#".repeat(level), source_text(cell.get("source"))),
            }
        }
        other => Cell {
            kind: other.to_string(),
            text: source_text(cell.get("source")),
        },
    }
}

/// Cell source may be one string or a list of line strings.
fn source_text(source: Option<&Value>) -> String {
    match source {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(lines)) => lines.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn first_heading(markdown: &str) -> Option<&str> {
    markdown
        .lines()
        .map(str::trim_start)
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim())
}
