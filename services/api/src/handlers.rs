//! Axum Handlers for the REST API
//!
//! Scenario discovery, the stateful practice-session lifecycle, and the two
//! stateless practice endpoints. It uses `utoipa` doc comments to generate
//! OpenAPI documentation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use goftogu_core::{
    PracticeError, orchestrator::EvaluateConversationInput, session::PracticeSession,
};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    models::{
        ConversationOutputBody, CreateSessionPayload, ErrorResponse, EvaluatePayload, EvaluationBody,
        PracticeTurnPayload, ScenarioSummary, SendMessagePayload, SessionView, TurnResponse,
    },
    state::AppState,
    store::{SessionHandle, StoredSession},
};

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    BadGateway(String),
    GatewayTimeout(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::BadGateway(message) => (StatusCode::BAD_GATEWAY, message),
            ApiError::GatewayTimeout(message) => (StatusCode::GATEWAY_TIMEOUT, message),
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}

impl From<PracticeError> for ApiError {
    fn from(err: PracticeError) -> Self {
        match err {
            PracticeError::InvalidInput(_) => Self::BadRequest(err.to_string()),
            PracticeError::UnknownScenario(_) => Self::NotFound(err.to_string()),
            PracticeError::InvalidState { .. } => Self::Conflict(err.to_string()),
            PracticeError::Generation(ref source) => {
                error!("Generation failed: {:?}", source);
                Self::BadGateway(err.to_string())
            }
            PracticeError::Timeout(_) => Self::GatewayTimeout(err.to_string()),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

async fn find_session(state: &AppState, id: Uuid) -> Result<SessionHandle, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session with id '{}' not found", id)))
}

/// Locks a session for a mutating request, refusing instead of queueing when
/// another request for it is still in flight.
fn lock_for_update(handle: &SessionHandle) -> Result<MutexGuard<'_, StoredSession>, ApiError> {
    handle.try_lock().map_err(|_| {
        ApiError::Conflict("A request for this session is already in progress".to_string())
    })
}

async fn load_vocabulary(state: &AppState) -> Result<Vec<String>, ApiError> {
    let vocabulary = state.vocabulary.list_vocabulary().await?;
    Ok(vocabulary)
}

/// List the available practice scenarios.
#[utoipa::path(
    get,
    path = "/scenarios",
    responses(
        (status = 200, description = "All practice scenarios", body = [ScenarioSummary])
    )
)]
pub async fn list_scenarios(State(state): State<Arc<AppState>>) -> Json<Vec<ScenarioSummary>> {
    Json(
        state
            .registry
            .list_scenarios()
            .iter()
            .map(ScenarioSummary::from)
            .collect(),
    )
}

/// Create a practice session for a scenario, drawing one of its objectives at random.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionPayload,
    responses(
        (status = 201, description = "Session created successfully", body = SessionView),
        (status = 404, description = "Unknown scenario", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(scenario = %payload.scenario_id))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let scenario = state.registry.get(&payload.scenario_id)?;
    let vocabulary = load_vocabulary(&state).await?;
    let session = PracticeSession::new(scenario, &mut rand::rng(), vocabulary)?;

    let handle = state.sessions.insert(session).await;
    let stored = handle.lock().await;
    info!(session_id = %stored.id, scenario = %payload.scenario_id, "Practice session created");

    Ok((StatusCode::CREATED, Json(SessionView::from(&*stored))))
}

/// Get a specific session by its ID.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    responses(
        (status = 200, description = "Session details", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = find_session(&state, id).await?;
    let stored = handle.lock().await;
    Ok(Json(SessionView::from(&*stored)))
}

/// Discard a session.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session busy", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip(state))]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let handle = find_session(&state, id).await?;
    let _stored = lock_for_update(&handle)?;
    state.sessions.remove(id).await;
    info!(session_id = %id, "Practice session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Start the conversation: the persona speaks its opening line.
#[utoipa::path(
    post,
    path = "/sessions/{id}/begin",
    responses(
        (status = 200, description = "Session is now active", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session already started", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip(state))]
pub async fn begin_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = find_session(&state, id).await?;
    let mut stored = lock_for_update(&handle)?;
    stored.session.begin()?;
    stored.touch();
    Ok(Json(SessionView::from(&*stored)))
}

/// Send the learner's next message and receive the persona's reply.
#[utoipa::path(
    post,
    path = "/sessions/{id}/messages",
    request_body = SendMessagePayload,
    responses(
        (status = 200, description = "The persona replied", body = TurnResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session not active or busy", body = ErrorResponse),
        (status = 502, description = "Generation failed", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<TurnResponse>, ApiError> {
    let handle = find_session(&state, id).await?;
    let mut stored = lock_for_update(&handle)?;
    let output = stored
        .session
        .send_user_message(&payload.text, &state.orchestrator)
        .await?;
    stored.touch();

    Ok(Json(TurnResponse {
        session: SessionView::from(&*stored),
        output: ConversationOutputBody::from(output),
    }))
}

/// Abandon the conversation and have it evaluated as it stands.
#[utoipa::path(
    post,
    path = "/sessions/{id}/give-up",
    responses(
        (status = 200, description = "Session evaluated and complete", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session not active or busy", body = ErrorResponse),
        (status = 502, description = "Evaluation failed", body = ErrorResponse),
        (status = 504, description = "Evaluation timed out", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID")
    )
)]
#[instrument(skip(state))]
pub async fn give_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let handle = find_session(&state, id).await?;
    let mut stored = lock_for_update(&handle)?;
    stored.session.give_up(&state.orchestrator).await?;
    stored.touch();
    Ok(Json(SessionView::from(&*stored)))
}

/// Start a new session for the same scenario with a freshly drawn objective.
#[utoipa::path(
    post,
    path = "/sessions/{id}/restart",
    responses(
        (status = 201, description = "New session created", body = SessionView),
        (status = 404, description = "Session not found", body = ErrorResponse),
        (status = 409, description = "Session not complete", body = ErrorResponse)
    ),
    params(
        ("id" = Uuid, Path, description = "Session ID of the finished session")
    )
)]
#[instrument(skip(state))]
pub async fn restart_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, id).await?;
    let fresh = {
        let stored = lock_for_update(&handle)?;
        stored.session.restart(&state.registry, &mut rand::rng())?
    };

    let new_handle = state.sessions.insert(fresh).await;
    let stored = new_handle.lock().await;
    info!(previous = %id, session_id = %stored.id, "Practice session restarted");
    Ok((StatusCode::CREATED, Json(SessionView::from(&*stored))))
}

/// Run one stateless turn over a caller-supplied history.
#[utoipa::path(
    post,
    path = "/practice/turn",
    request_body = PracticeTurnPayload,
    responses(
        (status = 200, description = "The persona replied", body = ConversationOutputBody),
        (status = 400, description = "Invalid conversation input", body = ErrorResponse),
        (status = 502, description = "Generation failed", body = ErrorResponse),
        (status = 504, description = "Generation timed out", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(persona = %payload.persona.name))]
pub async fn practice_turn(
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<PracticeTurnPayload>,
) -> Result<Json<ConversationOutputBody>, ApiError> {
    let vocabulary = match payload.vocabulary.take() {
        Some(vocabulary) => vocabulary,
        None => load_vocabulary(&state).await?,
    };
    let output = state
        .orchestrator
        .practice_turn(payload.into_input(vocabulary))
        .await?;
    Ok(Json(ConversationOutputBody::from(output)))
}

/// Evaluate a conversation the learner abandoned.
#[utoipa::path(
    post,
    path = "/practice/evaluate",
    request_body = EvaluatePayload,
    responses(
        (status = 200, description = "Evaluation of the conversation", body = EvaluationBody),
        (status = 400, description = "Invalid conversation input", body = ErrorResponse),
        (status = 502, description = "Evaluation failed", body = ErrorResponse),
        (status = 504, description = "Evaluation timed out", body = ErrorResponse)
    )
)]
#[instrument(skip_all, fields(persona = %payload.persona_name))]
pub async fn evaluate_conversation(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<EvaluatePayload>,
) -> Result<Json<EvaluationBody>, ApiError> {
    let evaluation = state
        .orchestrator
        .evaluate_abandoned(EvaluateConversationInput::from(payload))
        .await
        .inspect_err(|e| warn!(error = %e, "Stateless evaluation failed"))?;
    Ok(Json(EvaluationBody::from(evaluation)))
}
