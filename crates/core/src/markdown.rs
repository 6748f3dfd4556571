//! Markdown rendering and parsing for conversation threads.
//!
//! A thread's `messages.md` is append-only. Each message is written as a metadata block
//! followed by the escaped request and response, and terminated by a horizontal rule:
//!
//! ```markdown
//! **Message ID:** 20260111T143522.045Z-550e8400e29b41d4a716446655440000
//! **Timestamp:** 2026-01-11T14:35:22.045Z
//!
//! #### Request
//!
//! Analyze the code
//!
//! #### Response
//!
//! \# Code Analysis Report
//! ...
//!
//! ---
//! ```
//!
//! Bodies are escaped so that they can never produce a line that looks like a section marker
//! or a message separator.

use crate::conversation::{ConversationThread, Message};
use crate::{CritiqueError, CritiqueResult};
use chrono::{DateTime, SecondsFormat, Utc};
use critique_uuid::TimestampId;

/// Header written once when a thread file is created.
const THREAD_HEADER: &str = "# Conversation";

const REQUEST_MARKER: &str = "#### Request";
const RESPONSE_MARKER: &str = "#### Response";
const MESSAGE_SEPARATOR: &str = "---";

/// Renders and parses thread message files.
#[derive(Debug, Clone, Default)]
pub struct ThreadMarkdown;

impl ThreadMarkdown {
    pub fn new() -> Self {
        Self
    }

    /// Content of a freshly created `messages.md`.
    pub fn thread_header(&self) -> String {
        format!("{}\n\n", THREAD_HEADER)
    }

    /// Renders one message, including its trailing separator.
    pub fn message_render(&self, message: &Message) -> String {
        let mut output = String::new();

        output.push_str(&format!("**Message ID:** {}\n", message.id));
        output.push_str(&format!(
            "**Timestamp:** {}\n",
            message
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        output.push('\n');

        output.push_str(REQUEST_MARKER);
        output.push_str("\n\n");
        output.push_str(&escape_body(&message.request));
        output.push_str("\n\n");

        output.push_str(RESPONSE_MARKER);
        output.push_str("\n\n");
        output.push_str(&escape_body(&message.response));
        output.push_str("\n\n");

        output.push_str(MESSAGE_SEPARATOR);
        output.push_str("\n\n");
        output
    }

    /// Renders a complete thread file.
    pub fn thread_render(&self, messages: &[Message]) -> String {
        let mut output = self.thread_header();
        for message in messages {
            output.push_str(&self.message_render(message));
        }
        output
    }

    /// Parses a thread file into its messages, in file order.
    ///
    /// Messages are split on lines consisting solely of `---`; escaped bodies never contain
    /// such a line.
    ///
    /// # Errors
    ///
    /// Returns [`CritiqueError::ThreadParse`] if a message is missing its metadata or markers.
    pub fn thread_parse(&self, content: &str) -> CritiqueResult<Vec<Message>> {
        let mut messages = Vec::new();
        let mut section: Vec<&str> = Vec::new();

        for line in content.lines() {
            if line == MESSAGE_SEPARATOR {
                messages.push(self.message_parse(&section)?);
                section.clear();
            } else {
                section.push(line);
            }
        }

        // A trailing section without a separator is either the header or whitespace.
        let has_content = section
            .iter()
            .any(|line| !line.trim().is_empty() && *line != THREAD_HEADER);
        if has_content {
            messages.push(self.message_parse(&section)?);
        }

        Ok(messages)
    }

    fn message_parse(&self, lines: &[&str]) -> CritiqueResult<Message> {
        let mut message_id: Option<TimestampId> = None;
        let mut request_start = None;
        let mut response_start = None;

        for (i, line) in lines.iter().enumerate() {
            if *line == REQUEST_MARKER {
                request_start = Some(i + 1);
            } else if *line == RESPONSE_MARKER {
                response_start = Some(i + 1);
                break;
            } else if request_start.is_none() {
                if let Some(value) = line.strip_prefix("**Message ID:**") {
                    message_id = Some(value.trim().parse().map_err(|e| {
                        CritiqueError::ThreadParse(format!("invalid message id: {}", e))
                    })?);
                }
            }
        }

        let id = message_id
            .ok_or_else(|| CritiqueError::ThreadParse("missing Message ID".to_string()))?;
        let request_start = request_start
            .ok_or_else(|| CritiqueError::ThreadParse(format!("message {} has no request", id)))?;
        let response_start = response_start
            .ok_or_else(|| CritiqueError::ThreadParse(format!("message {} has no response", id)))?;

        let request = &lines[request_start..response_start - 1];
        let response = &lines[response_start..];

        Ok(Message {
            id,
            request: unescape_body(&trim_blank_lines(request)),
            response: unescape_body(&trim_blank_lines(response)),
        })
    }

    /// Renders a thread for people to read, with bodies unescaped.
    pub fn history_render(&self, thread: &ConversationThread) -> String {
        let mut output = String::new();

        output.push_str(&format!("{} {}\n\n", THREAD_HEADER, thread.id));
        output.push_str(&format!("**Source:** {}\n", thread.source_url));
        output.push_str(&format!("**Started:** {}\n", format_time(thread.created_at)));

        for message in &thread.messages {
            output.push_str(&format!(
                "\n---\n\n**{}**\n\n### You\n\n{}\n\n### Assistant\n\n{}\n",
                format_time(message.timestamp()),
                message.request,
                message.response
            ));
        }

        output
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn trim_blank_lines(lines: &[&str]) -> String {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    lines[start..end.max(start)].join("\n")
}

fn is_horizontal_rule(trimmed: &str) -> bool {
    matches!(trimmed, "---" | "***" | "___")
}

/// Escapes line-start `#`, triple backticks and standalone horizontal rules.
///
/// Backslashes are doubled first, so every backslash in the output starts an escape pair and
/// [`unescape_body`] restores the original text exactly.
fn escape_body(body: &str) -> String {
    body.lines()
        .map(|line| {
            let mut line = line.replace('\\', r"\\").replace("```", r"\`\`\`");
            let indent = line.len() - line.trim_start().len();
            let trimmed = line.trim();
            if is_horizontal_rule(trimmed) || trimmed.starts_with('#') {
                line.insert(indent, '\\');
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn unescape_body(body: &str) -> String {
    body.lines()
        .map(|line| {
            let mut out = String::with_capacity(line.len());
            let mut chars = line.chars();
            while let Some(c) = chars.next() {
                if c == '\\' {
                    out.push(chars.next().unwrap_or('\\'));
                } else {
                    out.push(c);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}
