//! # API REST
//!
//! REST API implementation for the critique service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for wire types and `critique-core` for all behaviour.

#![warn(rust_2018_idioms)]

use api_shared::{
    AnalyzeReq, AnalyzeRes, ChatReq, ChatRes, ConversationsRes, ErrorRes, HealthRes,
    HealthService, HistoryRes, MessageView, ThreadSummaryView,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, SecondsFormat, Utc};
use critique_core::{ConversationId, CritiqueError, CritiqueService, ThreadSummary};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CritiqueService>,
}

impl AppState {
    pub fn new(service: CritiqueService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, analyze, chat, history, list_conversations),
    components(schemas(
        HealthRes,
        ErrorRes,
        AnalyzeReq,
        AnalyzeRes,
        ChatReq,
        ChatRes,
        HistoryRes,
        MessageView,
        ConversationsRes,
        ThreadSummaryView,
    ))
)]
pub struct ApiDoc;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorRes>)>;

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/chat", post(chat))
        .route("/history/:id", get(history))
        .route("/conversations", get(list_conversations))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps a core error to a status code and `{error}` body.
///
/// Unknown conversations are 404, storage failures 500, everything the caller or the file
/// host caused is 400.
fn error_response(e: CritiqueError) -> (StatusCode, Json<ErrorRes>) {
    let status = match &e {
        CritiqueError::NotFound(_) => StatusCode::NOT_FOUND,
        e if e.is_user_facing() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("request failed: {:?}", e);
    } else {
        tracing::warn!("request rejected: {}", e);
    }

    (
        status,
        Json(ErrorRes {
            error: e.to_string(),
        }),
    )
}

fn parse_conversation_id(id: &str) -> Result<ConversationId, (StatusCode, Json<ErrorRes>)> {
    ConversationId::parse(id.trim()).map_err(|e| error_response(CritiqueError::from(e)))
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn summary_view(summary: ThreadSummary) -> ThreadSummaryView {
    ThreadSummaryView {
        conversation_id: summary.id.to_string(),
        source_url: summary.source_url,
        created_at: format_time(summary.created_at),
        message_count: summary.message_count,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeReq,
    responses(
        (status = 200, description = "Markdown report and the new conversation id", body = AnalyzeRes),
        (status = 400, description = "Invalid URL, unsupported format or fetch failure", body = ErrorRes),
        (status = 500, description = "Conversation could not be stored", body = ErrorRes)
    )
)]
/// Analyse a Python script or notebook hosted on GitHub
///
/// Backend failures do not fail the request: the report then consists of placeholders and
/// names the failure in its summary.
#[axum::debug_handler]
async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeReq>) -> ApiResult<AnalyzeRes> {
    let outcome = state
        .service
        .analyze(&req.url)
        .await
        .map_err(error_response)?;

    Ok(Json(AnalyzeRes {
        conversation_id: outcome.conversation_id.to_string(),
        response: outcome.report,
    }))
}

#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatReq,
    responses(
        (status = 200, description = "Answer to the question", body = ChatRes),
        (status = 400, description = "Invalid conversation id or empty message", body = ErrorRes),
        (status = 404, description = "Unknown conversation", body = ErrorRes),
        (status = 500, description = "Conversation could not be stored", body = ErrorRes)
    )
)]
/// Ask a follow-up question about an analysed file
#[axum::debug_handler]
async fn chat(State(state): State<AppState>, Json(req): Json<ChatReq>) -> ApiResult<ChatRes> {
    let id = parse_conversation_id(&req.conversation_id)?;
    let response = state
        .service
        .chat(&id, &req.message)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatRes { response }))
}

#[utoipa::path(
    get,
    path = "/history/{id}",
    params(
        ("id" = String, Path, description = "Conversation id (32 lowercase hex characters)")
    ),
    responses(
        (status = 200, description = "Every message of the conversation, oldest first", body = HistoryRes),
        (status = 400, description = "Malformed conversation id", body = ErrorRes),
        (status = 404, description = "Unknown conversation", body = ErrorRes)
    )
)]
/// Read a conversation
#[axum::debug_handler]
async fn history(State(state): State<AppState>, AxumPath(id): AxumPath<String>) -> ApiResult<HistoryRes> {
    let id = parse_conversation_id(&id)?;
    let thread = state.service.history(&id).map_err(error_response)?;
    let rendered = state.service.render_history(&id).map_err(error_response)?;

    Ok(Json(HistoryRes {
        conversation_id: thread.id.to_string(),
        source_url: thread.source_url,
        created_at: format_time(thread.created_at),
        messages: thread
            .messages
            .into_iter()
            .map(|m| MessageView {
                id: m.id.to_string(),
                timestamp: format_time(m.timestamp()),
                request: m.request,
                response: m.response,
            })
            .collect(),
        rendered,
    }))
}

#[utoipa::path(
    get,
    path = "/conversations",
    responses(
        (status = 200, description = "Conversations, most recently started first", body = ConversationsRes),
        (status = 500, description = "Conversation storage could not be read", body = ErrorRes)
    )
)]
/// List conversations
#[axum::debug_handler]
async fn list_conversations(State(state): State<AppState>) -> ApiResult<ConversationsRes> {
    let conversations = state
        .service
        .list_threads()
        .map_err(error_response)?
        .into_iter()
        .map(summary_view)
        .collect();

    Ok(Json(ConversationsRes { conversations }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use critique_core::{
        BackendKind, CritiqueResult, FileSource, GenerativeTextBackend, InMemoryConversationStore,
        PromptPayload, SourceDocument, SourceKind,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct CannedBackend;

    #[async_trait]
    impl GenerativeTextBackend for CannedBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Gemini
        }

        async fn complete(&self, prompt: &PromptPayload) -> CritiqueResult<String> {
            if prompt.user.contains("Question:") {
                return Ok("It adds two numbers.".into());
            }
            Ok(r#"```json
{"proje_amaci": "Calculator", "kullanilan_teknolojiler": ["Python"]}
```"#
                .into())
        }
    }

    struct StaticSource;

    #[async_trait]
    impl FileSource for StaticSource {
        async fn fetch(&self, url: &str) -> CritiqueResult<SourceDocument> {
            let kind = SourceKind::from_url(url)?;
            if !url.starts_with("https://github.com/") {
                return Err(CritiqueError::InvalidUrl(url.to_string()));
            }
            SourceDocument::from_content(kind, "def add(a, b):\n    return a + b\n")
        }
    }

    fn app() -> Router {
        let service = CritiqueService::new(
            Arc::new(CannedBackend),
            Arc::new(StaticSource),
            Arc::new(InMemoryConversationStore::new()),
        );
        router(AppState::new(service))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    const URL: &str = "https://github.com/u/r/blob/main/calc.py";

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_analyze_chat_history_flow() {
        let app = app();

        let (status, body) = send(&app, "POST", "/analyze", Some(json!({ "url": URL }))).await;
        assert_eq!(status, StatusCode::OK);
        let id = body["conversationId"].as_str().unwrap().to_string();
        let report = body["response"].as_str().unwrap();
        assert!(report.contains("## Project Purpose\nCalculator"));
        assert!(report.contains("* Python"));

        let (status, body) = send(
            &app,
            "POST",
            "/chat",
            Some(json!({ "message": "What does add do?", "conversation_id": id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "It adds two numbers.");

        let (status, body) = send(&app, "GET", &format!("/history/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sourceUrl"], URL);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["request"], "Analyze the code");
        assert_eq!(messages[1]["request"], "What does add do?");
        assert!(body["rendered"].as_str().unwrap().contains("### Assistant"));

        let (status, body) = send(&app, "GET", "/conversations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["conversations"][0]["conversationId"], id.as_str());
        assert_eq!(body["conversations"][0]["messageCount"], 2);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_input_with_400() {
        let app = app();

        let (status, body) = send(
            &app,
            "POST",
            "/analyze",
            Some(json!({ "url": "https://github.com/u/r/blob/main/data.csv" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("unsupported file format"));

        let (status, body) = send(
            &app,
            "POST",
            "/analyze",
            Some(json!({ "url": "https://example.com/app.py" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_conversation_is_404() {
        let app = app();
        let unknown = ConversationId::new().to_string();

        let (status, body) = send(&app, "GET", &format!("/history/{unknown}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());

        let (status, _) = send(
            &app,
            "POST",
            "/chat",
            Some(json!({ "message": "hi", "conversationId": unknown })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_conversation_id_is_400() {
        let (status, body) = send(&app(), "GET", "/history/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_openapi_lists_every_route() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for path in ["/health", "/analyze", "/chat", "/history/{id}", "/conversations"] {
            assert!(doc["paths"].get(path).is_some(), "missing {path}");
        }
    }
}
