//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API and OpenAPI documentation.

use crate::{
    handlers,
    models::{
        ConversationOutputBody, CreateSessionPayload, ErrorResponse, EvaluatePayload,
        EvaluationBody, FeedbackBody, Message, MessageRole, ModelResponseBody, PersonaBody,
        PracticeTurnPayload, ScenarioSummary, ScoredFeedbackBody, SendMessagePayload, SessionView,
        TurnResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_scenarios,
        handlers::create_session,
        handlers::get_session,
        handlers::delete_session,
        handlers::begin_session,
        handlers::send_message,
        handlers::give_up,
        handlers::restart_session,
        handlers::practice_turn,
        handlers::evaluate_conversation,
    ),
    components(
        schemas(
            ScenarioSummary, PersonaBody, SessionView, Message, MessageRole, TurnResponse,
            ConversationOutputBody, ModelResponseBody, EvaluationBody, FeedbackBody,
            ScoredFeedbackBody, CreateSessionPayload, SendMessagePayload, PracticeTurnPayload,
            EvaluatePayload, ErrorResponse
        )
    ),
    tags(
        (name = "Goftogu API", description = "Roleplay conversation practice for Farsi learners")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/scenarios", get(handlers::list_scenarios))
        .route("/sessions", post(handlers::create_session))
        .route(
            "/sessions/{id}",
            get(handlers::get_session).delete(handlers::delete_session),
        )
        .route("/sessions/{id}/begin", post(handlers::begin_session))
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/sessions/{id}/give-up", post(handlers::give_up))
        .route("/sessions/{id}/restart", post(handlers::restart_session))
        .route("/practice/turn", post(handlers::practice_turn))
        .route("/practice/evaluate", post(handlers::evaluate_conversation))
        // Apply the state ONLY to this group of routes.
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
