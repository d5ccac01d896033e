//! Conversation Orchestrator
//!
//! Sequences a single practice turn: generate the persona's reply, and if that
//! reply reports the objective as met, grade the conversation. The orchestrator
//! keeps no state between calls; every request carries the full history.

use crate::dialogue::{Persona, Transcript};
use crate::error::{PracticeError, PracticeResult};
use crate::evaluation::Evaluation;
use crate::evaluator::{EvaluationGenerator, EvaluationRequest};
use crate::turn::{TurnGenerator, TurnRequest};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Input for one conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInput {
    pub persona: Persona,
    pub objective: String,
    #[serde(default)]
    pub vocabulary: Vec<String>,
    /// The history so far, ending with the learner's newest message.
    pub history: Transcript,
}

/// Input for grading a conversation the learner abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateConversationInput {
    pub persona_name: String,
    pub objective: String,
    pub history: Transcript,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub farsi: String,
    pub finglish: String,
}

/// The envelope returned for every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationOutput {
    pub response: ModelResponse,
    pub is_complete: bool,
    /// Present exactly when `is_complete` is true.
    pub evaluation: Option<Evaluation>,
}

pub struct ConversationOrchestrator {
    turns: Arc<dyn TurnGenerator>,
    evaluator: Arc<dyn EvaluationGenerator>,
    timeout: Duration,
}

impl ConversationOrchestrator {
    pub fn new(
        turns: Arc<dyn TurnGenerator>,
        evaluator: Arc<dyn EvaluationGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            turns,
            evaluator,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs one turn, evaluating the conversation if the objective was met.
    #[instrument(name = "practice_turn", skip_all, fields(persona = %input.persona.name, history = input.history.len()))]
    pub async fn practice_turn(&self, input: ConversationInput) -> PracticeResult<ConversationOutput> {
        let request = TurnRequest {
            persona: input.persona,
            objective: input.objective,
            vocabulary: input.vocabulary,
            transcript: input.history,
        };
        request.validate()?;

        let reply = self.bounded(self.turns.generate_turn(&request)).await?;
        let response = ModelResponse {
            farsi: reply.farsi.clone(),
            finglish: reply.finglish.clone(),
        };

        if !reply.objective_met {
            return Ok(ConversationOutput {
                response,
                is_complete: false,
                evaluation: None,
            });
        }

        info!("Objective met; evaluating conversation");
        let evaluation_request = EvaluationRequest {
            transcript: request.transcript.with(reply.into_message()),
            persona_name: request.persona.name,
            objective: request.objective,
            objective_met: true,
        };
        let evaluation = self
            .bounded(self.evaluator.generate_evaluation(&evaluation_request))
            .await?;

        Ok(ConversationOutput {
            response,
            is_complete: true,
            evaluation: Some(evaluation),
        })
    }

    /// Grades a conversation the learner gave up on, exactly as it stands.
    #[instrument(name = "evaluate_abandoned", skip_all, fields(persona = %input.persona_name, history = input.history.len()))]
    pub async fn evaluate_abandoned(
        &self,
        input: EvaluateConversationInput,
    ) -> PracticeResult<Evaluation> {
        let request = EvaluationRequest {
            transcript: input.history,
            persona_name: input.persona_name,
            objective: input.objective,
            objective_met: false,
        };
        request.validate()?;
        self.bounded(self.evaluator.generate_evaluation(&request)).await
    }

    async fn bounded<T>(&self, fut: impl Future<Output = PracticeResult<T>>) -> PracticeResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Generation call timed out");
                Err(PracticeError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::{DialogueMessage, DialogueRole};
    use crate::evaluation::sample_evaluation;
    use crate::evaluator::MockEvaluationGenerator;
    use crate::turn::{MockTurnGenerator, TurnReply};
    use async_trait::async_trait;

    fn input(user_text: &str) -> ConversationInput {
        ConversationInput {
            persona: Persona::new("Alireza", "a friendly waiter"),
            objective: "order a main course and a drink".to_string(),
            vocabulary: vec![],
            history: Transcript::from(vec![
                DialogueMessage::model("چی میل دارید؟", "Chi meyl daarid?"),
                DialogueMessage::user(user_text),
            ]),
        }
    }

    fn reply(objective_met: bool) -> TurnReply {
        TurnReply {
            farsi: "چشم.".to_string(),
            finglish: "Cheshm.".to_string(),
            objective_met,
        }
    }

    fn orchestrator(
        turns: MockTurnGenerator,
        evaluator: MockEvaluationGenerator,
    ) -> ConversationOrchestrator {
        ConversationOrchestrator::new(
            Arc::new(turns),
            Arc::new(evaluator),
            DEFAULT_GENERATION_TIMEOUT,
        )
    }

    #[tokio::test]
    async fn test_objective_met_runs_evaluation_on_extended_history() {
        let mut turns = MockTurnGenerator::new();
        turns
            .expect_generate_turn()
            .times(1)
            .returning(|_| Ok(reply(true)));

        let mut evaluator = MockEvaluationGenerator::new();
        evaluator
            .expect_generate_evaluation()
            .withf(|req| {
                let last = req.transcript.last().unwrap();
                req.objective_met
                    && req.transcript.len() == 3
                    && last.role == DialogueRole::Model
                    && last.content == "چشم."
                    && req.persona_name == "Alireza"
            })
            .times(1)
            .returning(|_| Ok(sample_evaluation()));

        let output = orchestrator(turns, evaluator)
            .practice_turn(input("ye kabab va ye doogh lotfan"))
            .await
            .unwrap();
        assert!(output.is_complete);
        assert_eq!(output.response.finglish, "Cheshm.");
        assert_eq!(output.evaluation, Some(sample_evaluation()));
    }

    #[tokio::test]
    async fn test_objective_not_met_skips_evaluation() {
        let mut turns = MockTurnGenerator::new();
        turns.expect_generate_turn().returning(|_| Ok(reply(false)));
        let mut evaluator = MockEvaluationGenerator::new();
        evaluator.expect_generate_evaluation().times(0);

        let output = orchestrator(turns, evaluator)
            .practice_turn(input("salaam"))
            .await
            .unwrap();
        assert!(!output.is_complete);
        assert!(output.evaluation.is_none());
    }

    #[tokio::test]
    async fn test_turn_failure_is_not_objective_unmet() {
        let mut turns = MockTurnGenerator::new();
        turns
            .expect_generate_turn()
            .returning(|_| Err(PracticeError::generation("Failed to generate a conversation response.")));
        let mut evaluator = MockEvaluationGenerator::new();
        evaluator.expect_generate_evaluation().times(0);

        let err = orchestrator(turns, evaluator)
            .practice_turn(input("salaam"))
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::Generation(_)));
    }

    #[tokio::test]
    async fn test_invalid_history_rejected_before_generation() {
        let mut turns = MockTurnGenerator::new();
        turns.expect_generate_turn().times(0);
        let evaluator = MockEvaluationGenerator::new();

        let mut bad = input("salaam");
        bad.history = Transcript::new();
        let err = orchestrator(turns, evaluator).practice_turn(bad).await.unwrap_err();
        assert!(matches!(err, PracticeError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_abandonment_forces_objective_unmet() {
        let turns = MockTurnGenerator::new();
        let mut evaluator = MockEvaluationGenerator::new();
        evaluator
            .expect_generate_evaluation()
            .withf(|req| !req.objective_met && req.transcript.len() == 1)
            .times(1)
            .returning(|_| Ok(sample_evaluation()));

        let evaluation = orchestrator(turns, evaluator)
            .evaluate_abandoned(EvaluateConversationInput {
                persona_name: "Alireza".to_string(),
                objective: "order a main course and a drink".to_string(),
                history: Transcript::from(vec![DialogueMessage::model(
                    "چی میل دارید؟",
                    "Chi meyl daarid?",
                )]),
            })
            .await
            .unwrap();
        assert_eq!(evaluation, sample_evaluation());
    }

    struct SlowTurns;

    #[async_trait]
    impl TurnGenerator for SlowTurns {
        async fn generate_turn(&self, _request: &TurnRequest) -> PracticeResult<TurnReply> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(reply(false))
        }
    }

    #[tokio::test]
    async fn test_slow_generation_times_out() {
        let orchestrator = ConversationOrchestrator::new(
            Arc::new(SlowTurns),
            Arc::new(MockEvaluationGenerator::new()),
            Duration::from_millis(20),
        );
        let err = orchestrator.practice_turn(input("salaam")).await.unwrap_err();
        assert!(matches!(err, PracticeError::Timeout(d) if d == Duration::from_millis(20)));
    }
}
