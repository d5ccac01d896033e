//! Dialogue Turn Generator
//!
//! Produces the persona's next line and decides whether the learner's latest
//! message has met the scenario objective.

use crate::dialogue::{DialogueMessage, Persona, Transcript};
use crate::error::{PracticeError, PracticeResult};
use crate::llm_client::{LLMClient, StructuredRequest, complete_as};
use crate::prompts::{CONVERSATION_TURN, PromptSet};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, instrument};

/// Everything the generator needs to produce one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub persona: Persona,
    pub objective: String,
    pub vocabulary: Vec<String>,
    /// The conversation so far, ending with the learner's newest message.
    pub transcript: Transcript,
}

impl TurnRequest {
    /// Checks the request shape before any remote call is made.
    pub fn validate(&self) -> PracticeResult<()> {
        validate_persona(&self.persona)?;
        if self.objective.trim().is_empty() {
            return Err(PracticeError::invalid_input("objective must not be empty"));
        }
        match self.transcript.last() {
            None => Err(PracticeError::invalid_input("transcript must not be empty")),
            Some(last) if !last.is_user() => Err(PracticeError::invalid_input(
                "the last transcript message must come from the user",
            )),
            Some(last) if last.content.trim().is_empty() => Err(PracticeError::invalid_input(
                "the user message must not be empty",
            )),
            Some(_) => Ok(()),
        }
    }
}

pub(crate) fn validate_persona(persona: &Persona) -> PracticeResult<()> {
    if persona.name.trim().is_empty() {
        return Err(PracticeError::invalid_input("persona name must not be empty"));
    }
    if persona.role.trim().is_empty() {
        return Err(PracticeError::invalid_input("persona role must not be empty"));
    }
    Ok(())
}

/// The structured reply for a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TurnReply {
    /// The persona's reply in Farsi script.
    pub farsi: String,
    /// The Finglish transliteration of the reply.
    pub finglish: String,
    /// True ONLY if the user's latest message explicitly met every part of the objective.
    pub objective_met: bool,
}

impl TurnReply {
    pub fn into_message(self) -> DialogueMessage {
        DialogueMessage::model(self.farsi, self.finglish)
    }
}

/// Defines the contract for anything that can play the persona for one turn.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TurnGenerator: Send + Sync {
    async fn generate_turn(&self, request: &TurnRequest) -> PracticeResult<TurnReply>;
}

/// A `TurnGenerator` that prompts an LLM for a structured reply.
pub struct LLMTurnGenerator {
    client: Arc<dyn LLMClient>,
    prompts: Arc<PromptSet>,
}

impl LLMTurnGenerator {
    pub fn new(client: Arc<dyn LLMClient>, prompts: Arc<PromptSet>) -> Self {
        Self { client, prompts }
    }

    fn build_request(&self, request: &TurnRequest) -> PracticeResult<StructuredRequest> {
        let system_prompt = self
            .prompts
            .render(
                CONVERSATION_TURN,
                &[
                    ("persona_name", request.persona.name.as_str()),
                    ("persona_role", request.persona.role.as_str()),
                    ("objective", request.objective.as_str()),
                ],
            )
            .map_err(PracticeError::Generation)?;
        Ok(StructuredRequest::for_type::<TurnReply>(
            "conversation_turn",
            system_prompt,
            render_turn_context(request),
        ))
    }
}

/// Renders vocabulary, prior history and the latest user message as separate
/// sections. The latest section depends on nothing but the final message.
pub fn render_turn_context(request: &TurnRequest) -> String {
    let mut out = String::from("<vocabulary>\n");
    for term in &request.vocabulary {
        let _ = writeln!(out, "- {}", term);
    }
    out.push_str("</vocabulary>\n\n<history>\n");

    let (latest, earlier) = match request.transcript.split_last() {
        Some((latest, earlier)) => (latest.content.as_str(), earlier),
        None => ("", &[][..]),
    };
    for message in earlier {
        let speaker = if message.is_user() {
            "User"
        } else {
            request.persona.name.as_str()
        };
        let _ = writeln!(out, "{}: {}", speaker, message.content);
    }
    out.push_str("</history>\n\n");
    out.push_str(&render_latest_section(latest));
    out.push_str(
        "\nAnalyze the latest user message and provide your response and the `objective_met` flag as a JSON object.\n",
    );
    out
}

fn render_latest_section(latest: &str) -> String {
    format!("<latest_user_message>\n{}\n</latest_user_message>\n", latest)
}

#[async_trait]
impl TurnGenerator for LLMTurnGenerator {
    #[instrument(name = "generate_turn", skip_all, fields(persona = %request.persona.name, turns = request.transcript.len()))]
    async fn generate_turn(&self, request: &TurnRequest) -> PracticeResult<TurnReply> {
        request.validate()?;
        let structured = self.build_request(request)?;

        let reply: TurnReply = complete_as(self.client.as_ref(), structured)
            .await
            .map_err(PracticeError::Generation)?;

        if reply.farsi.trim().is_empty() {
            return Err(PracticeError::generation("turn reply contained no Farsi text"));
        }
        info!(objective_met = reply.objective_met, "Generated conversation turn");
        Ok(reply)
    }
}
