//! Evaluation Generator
//!
//! Grades a finished practice conversation across five dimensions.

use crate::dialogue::Transcript;
use crate::error::{PracticeError, PracticeResult};
use crate::evaluation::Evaluation;
use crate::llm_client::{LLMClient, StructuredRequest, complete_as};
use crate::prompts::{EVALUATION, PromptSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub transcript: Transcript,
    pub persona_name: String,
    pub objective: String,
    /// Always false when the learner gave up.
    pub objective_met: bool,
}

impl EvaluationRequest {
    pub fn validate(&self) -> PracticeResult<()> {
        if self.transcript.is_empty() {
            return Err(PracticeError::invalid_input("transcript must not be empty"));
        }
        if self.persona_name.trim().is_empty() {
            return Err(PracticeError::invalid_input("persona name must not be empty"));
        }
        if self.objective.trim().is_empty() {
            return Err(PracticeError::invalid_input("objective must not be empty"));
        }
        Ok(())
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationGenerator: Send + Sync {
    async fn generate_evaluation(&self, request: &EvaluationRequest) -> PracticeResult<Evaluation>;
}

/// An `EvaluationGenerator` that asks an LLM to grade the transcript.
pub struct LLMEvaluationGenerator {
    client: Arc<dyn LLMClient>,
    prompts: Arc<PromptSet>,
}

impl LLMEvaluationGenerator {
    pub fn new(client: Arc<dyn LLMClient>, prompts: Arc<PromptSet>) -> Self {
        Self { client, prompts }
    }
}

/// Renders the transcript with `User:` and persona-name speaker labels.
pub fn render_transcript(request: &EvaluationRequest) -> String {
    let mut out = String::from("<conversationHistory>\n");
    for message in &request.transcript {
        let speaker = if message.is_user() {
            "User"
        } else {
            request.persona_name.as_str()
        };
        let _ = writeln!(out, "{}: {}", speaker, message.content);
    }
    out.push_str("</conversationHistory>\n");
    out
}

#[async_trait]
impl EvaluationGenerator for LLMEvaluationGenerator {
    #[instrument(name = "generate_evaluation", skip_all, fields(persona = %request.persona_name, objective_met = request.objective_met))]
    async fn generate_evaluation(&self, request: &EvaluationRequest) -> PracticeResult<Evaluation> {
        request.validate()?;

        let objective_met = request.objective_met.to_string();
        let system_prompt = self
            .prompts
            .render(
                EVALUATION,
                &[
                    ("persona_name", request.persona_name.as_str()),
                    ("objective", request.objective.as_str()),
                    ("objective_met", objective_met.as_str()),
                ],
            )
            .map_err(PracticeError::Generation)?;

        let structured = StructuredRequest::for_type::<Evaluation>(
            "evaluation",
            system_prompt,
            render_transcript(request),
        );
        let evaluation: Evaluation = complete_as(self.client.as_ref(), structured)
            .await
            .map_err(PracticeError::Generation)?;
        evaluation.validate()?;

        info!(
            formality = evaluation.formality.score,
            grammar = evaluation.grammar.score,
            "Generated evaluation"
        );
        Ok(evaluation)
    }
}
