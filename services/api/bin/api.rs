//! Main Entrypoint for the Goftogu API Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Loading prompt templates and the vocabulary source.
//! 3. Initializing the LLM client, generators, and orchestrator.
//! 4. Constructing the Axum router and applying middleware.
//! 5. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use goftogu_api::{config::Config, router::create_router, state::AppState, store::SessionStore};
use goftogu_core::{
    evaluator::LLMEvaluationGenerator,
    llm_client::{LLMClient, OpenAICompatibleClient},
    orchestrator::ConversationOrchestrator,
    prompts::PromptSet,
    scenario::ScenarioRegistry,
    turn::LLMTurnGenerator,
    vocabulary::{JsonFileVocabularyProvider, StaticVocabularyProvider, VocabularyProvider},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {}", e);
        return;
    }
    info!("Received shutdown signal. Shutting down gracefully...");
}

/// Evicts idle sessions once per TTL, for sessions nobody looks up again.
async fn sweep_expired_sessions(sessions: SessionStore) {
    let mut interval = tokio::time::interval(sessions.ttl());
    interval.tick().await;
    loop {
        interval.tick().await;
        let evicted = sessions.purge_expired().await;
        if evicted > 0 {
            let live = sessions.len().await;
            info!(evicted, live, "Expired sessions evicted");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    // --- 3. Load Prompts and Vocabulary ---
    let prompts = match &config.prompts_path {
        Some(dir) => {
            info!(path = %dir.display(), "Loading prompt overrides");
            PromptSet::load_overrides(dir)?
        }
        None => PromptSet::builtin(),
    };
    let prompts = Arc::new(prompts);

    let vocabulary: Arc<dyn VocabularyProvider> = match &config.vocabulary_path {
        Some(path) => {
            info!(path = %path.display(), "Reading vocabulary from content export");
            Arc::new(JsonFileVocabularyProvider::new(path.clone()))
        }
        None => {
            info!("No vocabulary source configured; prompts will carry no known terms.");
            Arc::new(StaticVocabularyProvider::empty())
        }
    };

    // --- 4. Initialize Shared Services ---
    info!(provider = ?config.provider, "Configuring LLM provider.");
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.api_key()?)
        .with_api_base(config.provider.api_base());
    let llm_client: Arc<dyn LLMClient> = Arc::new(OpenAICompatibleClient::new(
        openai_config,
        config.chat_model.clone(),
    ));

    let orchestrator = ConversationOrchestrator::new(
        Arc::new(LLMTurnGenerator::new(llm_client.clone(), prompts.clone())),
        Arc::new(LLMEvaluationGenerator::new(llm_client, prompts)),
        config.generation_timeout,
    );

    let sessions = SessionStore::with_ttl(config.session_ttl);
    tokio::spawn(sweep_expired_sessions(sessions.clone()));

    let app_state = Arc::new(AppState {
        registry: Arc::new(ScenarioRegistry::builtin()),
        sessions,
        orchestrator: Arc::new(orchestrator),
        vocabulary,
    });

    // --- 5. Create Router and Apply Middleware ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(app_state).layer(cors);

    // --- 6. Start Server ---
    info!(
        provider = ?config.provider,
        model = %config.chat_model,
        bind_address = %config.bind_address,
        timeout = ?config.generation_timeout,
        session_ttl = ?config.session_ttl,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server has shut down.");
    Ok(())
}
