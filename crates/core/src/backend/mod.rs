//! Generative text backends.
//!
//! Every backend is reached through the single [`GenerativeTextBackend`] capability, so the
//! prompt builder and the normalizer never branch on which service produced the text. The
//! [`select_backend`] function decides which backend a process uses; it is evaluated once at
//! startup and a failure there is fatal.

mod gemini;
mod openai;

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use crate::config::{BackendPreference, CoreConfig};
use crate::prompt::PromptPayload;
use crate::{CritiqueError, CritiqueResult};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Known backend names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BackendKind {
    OpenAi,
    Gemini,
}

impl BackendKind {
    /// Order used by automatic selection: primary first.
    pub const PRIORITY: [BackendKind; 2] = [BackendKind::OpenAi, BackendKind::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BackendKind {
    type Err = CritiqueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "gemini" => Ok(BackendKind::Gemini),
            other => Err(CritiqueError::Configuration(format!(
                "unknown AI service '{}' (expected auto, openai or gemini)",
                other
            ))),
        }
    }
}

/// A service that turns a prompt into free text.
#[async_trait]
pub trait GenerativeTextBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Sends the prompt and returns the raw response text.
    async fn complete(&self, prompt: &PromptPayload) -> CritiqueResult<String>;
}

/// Picks exactly one backend from the available credentials and the preference.
///
/// # Errors
///
/// Returns [`CritiqueError::Configuration`] when the explicitly preferred backend has no
/// credential, or when no backend has one at all.
pub fn select_backend(
    available: &BTreeSet<BackendKind>,
    preference: BackendPreference,
) -> CritiqueResult<BackendKind> {
    match preference {
        BackendPreference::Explicit(kind) if available.contains(&kind) => Ok(kind),
        BackendPreference::Explicit(kind) => Err(CritiqueError::Configuration(format!(
            "{} API key not found",
            kind
        ))),
        BackendPreference::Auto => BackendKind::PRIORITY
            .into_iter()
            .find(|kind| available.contains(kind))
            .ok_or_else(|| {
                CritiqueError::Configuration("no valid API key found for any AI service".into())
            }),
    }
}

/// Selects the backend for `cfg` and constructs its client.
pub fn build_backend(cfg: &CoreConfig) -> CritiqueResult<Arc<dyn GenerativeTextBackend>> {
    let credentials = cfg.credentials();
    let kind = select_backend(&credentials.available(), cfg.preference())?;
    let api_key = credentials
        .key(kind)
        .ok_or_else(|| CritiqueError::Configuration(format!("{} API key not found", kind)))?
        .to_string();
    let client = http_client(cfg.backend_timeout())?;
    let endpoint = cfg.endpoint(kind).clone();

    tracing::info!("selected {} backend (model {})", kind, endpoint.model);

    let backend: Arc<dyn GenerativeTextBackend> = match kind {
        BackendKind::OpenAi => Arc::new(OpenAiBackend::new(
            client,
            endpoint,
            api_key,
            cfg.temperature(),
        )),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(
            client,
            endpoint,
            api_key,
            cfg.temperature(),
        )),
    };
    Ok(backend)
}

pub(crate) fn http_client(timeout: Duration) -> CritiqueResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CritiqueError::Configuration(format!("failed to build HTTP client: {}", e)))
}

/// Shortens an error body for inclusion in a message.
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
