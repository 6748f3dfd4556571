use api_rest::{AppState, router};
use critique_core::{CritiqueService, config_from_lookup};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the critique service
///
/// Resolves configuration once, selects the generative text backend and serves the REST API
/// (with Swagger UI at `/swagger-ui`) until interrupted.
///
/// # Environment Variables
/// - `CRITIQUE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `OPENAI_API_KEY`, `GEMINI_API_KEY`: Backend credentials; at least one must be set
/// - `DEFAULT_AI_SERVICE`: `auto` (default), `openai` or `gemini`
/// - `OPENAI_MODEL`, `GEMINI_MODEL`, `OPENAI_BASE_URL`, `GEMINI_BASE_URL`: Backend overrides
/// - `CRITIQUE_TEMPERATURE`, `CRITIQUE_BACKEND_TIMEOUT_SECS`: Request tuning
/// - `CRITIQUE_DATA_DIR`: Conversation storage root (default: "conversation_data")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, backend selection or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("critique_run=info".parse()?)
                .add_directive("critique_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr =
        std::env::var("CRITIQUE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = config_from_lookup(|name| std::env::var(name).ok())?;
    let service = match CritiqueService::from_config(&cfg) {
        Ok(service) => service,
        Err(e) => anyhow::bail!("cannot start without a usable AI service: {}", e),
    };

    tracing::info!("++ Storing conversations under {}", cfg.data_dir().display());
    tracing::info!("++ Starting critique REST on {}", rest_addr);

    let app = router(AppState::new(service));
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}
