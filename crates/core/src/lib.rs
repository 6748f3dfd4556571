//! # Critique Core
//!
//! Core logic for the code critique service.
//!
//! This crate turns a link to a Python script or notebook into a structured code review:
//! - Fetching the file and digesting notebook documentation ([`source`])
//! - Building the prompt and calling one generative text backend ([`prompt`], [`backend`])
//! - Recovering a complete [`AnalysisRecord`] from whatever text comes back ([`normalizer`])
//! - Rendering the record as a markdown report ([`report`])
//! - Keeping conversation threads on disk ([`conversation`], [`markdown`])
//!
//! **No API concerns**: HTTP servers and request/response types belong in `api-rest` and
//! `api-shared`.

pub mod backend;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod error;
pub mod markdown;
pub mod normalizer;
pub mod prompt;
pub mod record;
pub mod report;
pub mod service;
pub mod source;

pub use backend::{build_backend, select_backend, BackendKind, GenerativeTextBackend};
pub use config::{config_from_lookup, BackendEndpoint, BackendPreference, CoreConfig, Credentials};
pub use conversation::{
    ConversationStore, ConversationThread, FileConversationStore, InMemoryConversationStore,
    Message, ThreadSummary,
};
pub use error::{CritiqueError, CritiqueResult};
pub use normalizer::{normalize, RecoveryStage, ResponseNormalizer};
pub use prompt::{PromptBuilder, PromptPayload};
pub use record::{AnalysisRecord, CodeExample};
pub use report::ReportRenderer;
pub use service::{AnalysisOutcome, CritiqueService};
pub use source::{DocumentationDigest, FileSource, GitHubSource, SourceDocument, SourceKind};

pub use critique_types::NonEmptyText;
pub use critique_uuid::{ConversationId, TimestampId};
