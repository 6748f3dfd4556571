//! Orchestration of analysis and follow-up chat.
//!
//! [`CritiqueService`] is the single entry point used by the REST API and the CLI. It wires a
//! file source, a backend, the normalizer and renderer, and a conversation store together.
//! Backend failures never surface as errors from here: analysis degrades to a placeholder
//! report and chat to an error answer, and both are still recorded in the thread.

use crate::backend::{build_backend, GenerativeTextBackend};
use crate::config::CoreConfig;
use crate::constants::ANALYZE_REQUEST_TEXT;
use crate::conversation::{
    ConversationStore, ConversationThread, FileConversationStore, ThreadSummary,
};
use crate::markdown::ThreadMarkdown;
use crate::normalizer::ResponseNormalizer;
use crate::prompt::PromptBuilder;
use crate::record::AnalysisRecord;
use crate::report::ReportRenderer;
use crate::source::{FileSource, GitHubSource};
use crate::{CritiqueError, CritiqueResult};
use critique_uuid::ConversationId;
use std::sync::Arc;

/// Result of analysing one file.
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    pub conversation_id: ConversationId,
    pub record: AnalysisRecord,
    pub report: String,
}

pub struct CritiqueService {
    backend: Arc<dyn GenerativeTextBackend>,
    source: Arc<dyn FileSource>,
    store: Arc<dyn ConversationStore>,
    prompts: PromptBuilder,
    normalizer: ResponseNormalizer,
    renderer: ReportRenderer,
    markdown: ThreadMarkdown,
}

impl CritiqueService {
    pub fn new(
        backend: Arc<dyn GenerativeTextBackend>,
        source: Arc<dyn FileSource>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            backend,
            source,
            store,
            prompts: PromptBuilder::new(),
            normalizer: ResponseNormalizer::new(),
            renderer: ReportRenderer::new(),
            markdown: ThreadMarkdown::new(),
        }
    }

    /// Production wiring: the selected backend, GitHub as file source and on-disk threads.
    ///
    /// # Errors
    ///
    /// Returns [`CritiqueError::Configuration`] if no backend can be selected.
    pub fn from_config(cfg: &CoreConfig) -> CritiqueResult<Self> {
        let backend = build_backend(cfg)?;
        let source = GitHubSource::with_timeout(cfg.backend_timeout())?;
        let store = FileConversationStore::from_config(cfg);
        Ok(Self::new(backend, Arc::new(source), Arc::new(store)))
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Fetches, analyses and reports on the file at `url`, recording the report in a new thread.
    ///
    /// # Errors
    ///
    /// Returns URL, format, fetch and notebook errors before any thread is created, and
    /// storage errors if the thread cannot be written.
    pub async fn analyze(&self, url: &str) -> CritiqueResult<AnalysisOutcome> {
        let url = non_blank(url, "url")?;
        let document = self.source.fetch(url).await?;

        let prompt = self.prompts.build(&document.text, document.digest.as_ref());
        let record = match self.backend.complete(&prompt).await {
            Ok(raw) => self.normalizer.normalize(&raw),
            Err(e) => {
                tracing::warn!("analysis of {} failed: {}", url, e);
                AnalysisRecord::placeholder_with_note(&format!("Backend error: {}", reason(&e)))
            }
        };
        let report = self.renderer.render(&record);

        let conversation_id = self.store.start_thread(url)?;
        self.store
            .append_message(&conversation_id, ANALYZE_REQUEST_TEXT, &report)?;

        tracing::info!("analysed {} into conversation {}", url, conversation_id);
        Ok(AnalysisOutcome {
            conversation_id,
            record,
            report,
        })
    }

    /// Answers a question about the file a thread was started for, and records the exchange.
    ///
    /// # Errors
    ///
    /// Returns [`CritiqueError::NotFound`] for an unknown thread, and fetch or storage errors.
    pub async fn chat(&self, id: &ConversationId, message: &str) -> CritiqueResult<String> {
        let message = non_blank(message, "message")?;
        let thread = self.store.get_thread(id)?;
        let document = self.source.fetch(&thread.source_url).await?;

        let prompt = self.prompts.build_chat(&document.text, message);
        let answer = match self.backend.complete(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("chat in conversation {} failed: {}", id, e);
                format!("Chat error: {}", reason(&e))
            }
        };

        self.store.append_message(id, message, &answer)?;
        Ok(answer)
    }

    pub fn history(&self, id: &ConversationId) -> CritiqueResult<ConversationThread> {
        self.store.get_thread(id)
    }

    /// The thread as a readable markdown document.
    pub fn render_history(&self, id: &ConversationId) -> CritiqueResult<String> {
        Ok(self.markdown.history_render(&self.store.get_thread(id)?))
    }

    pub fn list_threads(&self) -> CritiqueResult<Vec<ThreadSummary>> {
        self.store.list_threads()
    }
}

fn non_blank<'a>(value: &'a str, name: &str) -> CritiqueResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CritiqueError::InvalidInput(format!("{} must not be empty", name)));
    }
    Ok(trimmed)
}

/// The failure text without the variant prefix.
fn reason(err: &CritiqueError) -> String {
    match err {
        CritiqueError::Backend(reason) => reason.clone(),
        other => other.to_string(),
    }
}
