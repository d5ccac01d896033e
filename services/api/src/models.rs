//! API Models
//!
//! Request and response bodies for the REST API. Core types are mirrored here
//! so that `utoipa` can describe them in the OpenAPI document.

use chrono::{DateTime, Utc};
use goftogu_core::{
    dialogue::{DialogueMessage, DialogueRole, Persona, Transcript},
    evaluation::{Evaluation, Feedback, ScoredFeedback},
    orchestrator::{ConversationInput, ConversationOutput, EvaluateConversationInput},
    scenario::Scenario,
    session::SessionStatus,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::store::StoredSession;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, Copy, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Model,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Model => write!(f, "model"),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct Message {
    #[schema(example = "user")]
    pub role: MessageRole,
    #[schema(example = "ye chelo kabab mikhaam")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finglish: Option<String>,
}

impl From<&DialogueMessage> for Message {
    fn from(msg: &DialogueMessage) -> Self {
        Self {
            role: match msg.role {
                DialogueRole::User => MessageRole::User,
                DialogueRole::Model => MessageRole::Model,
            },
            content: msg.content.clone(),
            finglish: msg.finglish.clone(),
        }
    }
}

impl From<Message> for DialogueMessage {
    fn from(msg: Message) -> Self {
        Self {
            role: match msg.role {
                MessageRole::User => DialogueRole::User,
                MessageRole::Model => DialogueRole::Model,
            },
            content: msg.content,
            finglish: msg.finglish,
        }
    }
}

fn to_transcript(history: Vec<Message>) -> Transcript {
    Transcript::from(
        history
            .into_iter()
            .map(DialogueMessage::from)
            .collect::<Vec<_>>(),
    )
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct PersonaBody {
    #[schema(example = "Alireza")]
    pub name: String,
    #[schema(example = "a friendly waiter")]
    pub role: String,
}

impl From<&Persona> for PersonaBody {
    fn from(p: &Persona) -> Self {
        Self {
            name: p.name.clone(),
            role: p.role.clone(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ScenarioSummary {
    #[schema(example = "restaurant")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub persona: PersonaBody,
    pub objective_count: usize,
}

impl From<&Scenario> for ScenarioSummary {
    fn from(s: &Scenario) -> Self {
        Self {
            id: s.id.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            persona: PersonaBody::from(&s.persona),
            objective_count: s.objectives.len(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct FeedbackBody {
    pub feedback: String,
}

impl From<Feedback> for FeedbackBody {
    fn from(f: Feedback) -> Self {
        Self {
            feedback: f.feedback,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct ScoredFeedbackBody {
    #[schema(minimum = 1, maximum = 5, example = 4)]
    pub score: u8,
    pub feedback: String,
}

impl From<ScoredFeedback> for ScoredFeedbackBody {
    fn from(f: ScoredFeedback) -> Self {
        Self {
            score: f.score,
            feedback: f.feedback,
        }
    }
}

/// The post-conversation review.
#[derive(Serialize, ToSchema, Debug, Clone, PartialEq)]
pub struct EvaluationBody {
    pub objective: FeedbackBody,
    pub formality: ScoredFeedbackBody,
    pub grammar: ScoredFeedbackBody,
    pub taarof: FeedbackBody,
    pub overall: FeedbackBody,
}

impl From<Evaluation> for EvaluationBody {
    fn from(e: Evaluation) -> Self {
        Self {
            objective: e.objective.into(),
            formality: e.formality.into(),
            grammar: e.grammar.into(),
            taarof: e.taarof.into(),
            overall: e.overall.into(),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct SessionView {
    #[schema(value_type = String, format = Uuid)]
    pub id: Uuid,
    pub scenario_id: String,
    pub persona: PersonaBody,
    pub intro: String,
    pub objective: String,
    #[schema(value_type = String, example = "active")]
    pub status: SessionStatus,
    pub transcript: Vec<Message>,
    pub evaluation: Option<EvaluationBody>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&StoredSession> for SessionView {
    fn from(stored: &StoredSession) -> Self {
        let session = &stored.session;
        Self {
            id: stored.id,
            scenario_id: session.scenario_id().to_string(),
            persona: PersonaBody::from(session.persona()),
            intro: session.intro().to_string(),
            objective: session.objective().to_string(),
            status: session.status(),
            transcript: session.transcript().messages().iter().map(Message::from).collect(),
            evaluation: session.evaluation().cloned().map(EvaluationBody::from),
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ModelResponseBody {
    pub farsi: String,
    pub finglish: String,
}

/// The response envelope for every turn.
#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ConversationOutputBody {
    pub response: ModelResponseBody,
    pub is_complete: bool,
    pub evaluation: Option<EvaluationBody>,
}

impl From<ConversationOutput> for ConversationOutputBody {
    fn from(output: ConversationOutput) -> Self {
        Self {
            response: ModelResponseBody {
                farsi: output.response.farsi,
                finglish: output.response.finglish,
            },
            is_complete: output.is_complete,
            evaluation: output.evaluation.map(EvaluationBody::from),
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct TurnResponse {
    pub session: SessionView,
    pub output: ConversationOutputBody,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateSessionPayload {
    #[schema(example = "restaurant")]
    pub scenario_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessagePayload {
    #[schema(example = "salaam, ye chelo kabab va ye doogh mikhaam")]
    pub text: String,
}

/// A stateless turn: the caller supplies the whole history.
#[derive(Deserialize, ToSchema)]
pub struct PracticeTurnPayload {
    pub persona: PersonaBody,
    pub objective: String,
    /// Known vocabulary lines. Taken from the vocabulary provider when omitted.
    #[serde(default)]
    pub vocabulary: Option<Vec<String>>,
    pub history: Vec<Message>,
}

impl PracticeTurnPayload {
    pub fn into_input(self, vocabulary: Vec<String>) -> ConversationInput {
        ConversationInput {
            persona: Persona::new(self.persona.name, self.persona.role),
            objective: self.objective,
            vocabulary,
            history: to_transcript(self.history),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct EvaluatePayload {
    #[schema(example = "Alireza")]
    pub persona_name: String,
    pub objective: String,
    pub history: Vec<Message>,
}

impl From<EvaluatePayload> for EvaluateConversationInput {
    fn from(p: EvaluatePayload) -> Self {
        Self {
            persona_name: p.persona_name,
            objective: p.objective,
            history: to_transcript(p.history),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}
