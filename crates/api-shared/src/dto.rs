//! JSON request and response bodies.
//!
//! Field names are camelCase on the wire. Conversation ids are the canonical 32-character
//! lowercase hex form; timestamps are RFC 3339 strings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeReq {
    /// GitHub URL of a `.py` or `.ipynb` file.
    #[schema(example = "https://github.com/user/repo/blob/main/app.py")]
    pub url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRes {
    pub conversation_id: String,
    /// The rendered markdown report.
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatReq {
    pub message: String,
    #[serde(alias = "conversation_id")]
    pub conversation_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub timestamp: String,
    pub request: String,
    pub response: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRes {
    pub conversation_id: String,
    pub source_url: String,
    pub created_at: String,
    pub messages: Vec<MessageView>,
    /// The whole thread as a markdown document.
    pub rendered: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummaryView {
    pub conversation_id: String,
    pub source_url: String,
    pub created_at: String,
    pub message_count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConversationsRes {
    /// Most recently started first.
    pub conversations: Vec<ThreadSummaryView>,
}
