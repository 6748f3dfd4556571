//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging of the HTTP surface. The workspace's main
//! `critique-run` binary serves the same router.

use api_rest::{router, AppState};
use critique_core::{config_from_lookup, CritiqueService};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the critique REST API server
///
/// # Environment Variables
/// - `CRITIQUE_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `OPENAI_API_KEY` / `GEMINI_API_KEY`: Backend credentials (at least one is required)
/// - `DEFAULT_AI_SERVICE`: `auto`, `openai` or `gemini`
/// - `CRITIQUE_DATA_DIR`: Conversation storage root (default: "conversation_data")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or no backend has a credential,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("critique_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CRITIQUE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    tracing::info!("-- Starting critique REST API on {}", addr);

    let cfg = config_from_lookup(|name| std::env::var(name).ok())?;
    let service = CritiqueService::from_config(&cfg)?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
