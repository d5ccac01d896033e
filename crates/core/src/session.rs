//! Practice Session State Machine
//!
//! A session moves `NotStarted -> Active -> Evaluating -> Complete`. It is owned
//! by the caller and advanced one action at a time; a failed action leaves the
//! transcript and status exactly as they were before it.

use crate::dialogue::{DialogueMessage, Persona, Transcript};
use crate::error::{PracticeError, PracticeResult};
use crate::evaluation::Evaluation;
use crate::orchestrator::{ConversationInput, ConversationOrchestrator, ConversationOutput, EvaluateConversationInput};
use crate::scenario::{Scenario, ScenarioRegistry};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Active,
    Evaluating,
    Complete,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::NotStarted => "not_started",
            SessionStatus::Active => "active",
            SessionStatus::Evaluating => "evaluating",
            SessionStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeSession {
    scenario_id: String,
    persona: Persona,
    intro: String,
    objective: String,
    #[serde(skip)]
    opening: DialogueMessage,
    #[serde(skip)]
    vocabulary: Vec<String>,
    transcript: Transcript,
    status: SessionStatus,
    evaluation: Option<Evaluation>,
}

impl PracticeSession {
    /// Creates a session for `scenario` with a randomly drawn objective.
    pub fn new<R: Rng + ?Sized>(
        scenario: &Scenario,
        rng: &mut R,
        vocabulary: Vec<String>,
    ) -> PracticeResult<Self> {
        let variant = scenario.choose_objective(rng)?;
        Ok(Self {
            scenario_id: scenario.id.clone(),
            persona: scenario.persona.clone(),
            intro: variant.intro.clone(),
            objective: variant.objective.clone(),
            opening: variant.opening.clone(),
            vocabulary,
            transcript: Transcript::new(),
            status: SessionStatus::NotStarted,
            evaluation: None,
        })
    }

    pub fn scenario_id(&self) -> &str {
        &self.scenario_id
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn intro(&self) -> &str {
        &self.intro
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    fn require(&self, expected: SessionStatus, action: &'static str) -> PracticeResult<()> {
        if self.status != expected {
            return Err(PracticeError::InvalidState {
                action,
                status: self.status.as_str(),
            });
        }
        Ok(())
    }

    /// Starts the conversation with the persona's opening line.
    pub fn begin(&mut self) -> PracticeResult<&DialogueMessage> {
        self.require(SessionStatus::NotStarted, "begin")?;
        self.transcript.push(self.opening.clone());
        self.status = SessionStatus::Active;
        info!(scenario = %self.scenario_id, "Practice session started");
        Ok(&self.opening)
    }

    /// Sends one learner message and records the persona's reply.
    ///
    /// On success the transcript grows by exactly two messages. If the reply
    /// met the objective the session completes with its evaluation.
    pub async fn send_user_message(
        &mut self,
        text: &str,
        orchestrator: &ConversationOrchestrator,
    ) -> PracticeResult<ConversationOutput> {
        self.require(SessionStatus::Active, "send a message")?;
        if text.trim().is_empty() {
            return Err(PracticeError::invalid_input("message must not be empty"));
        }

        let user_message = DialogueMessage::user(text.trim());
        let input = ConversationInput {
            persona: self.persona.clone(),
            objective: self.objective.clone(),
            vocabulary: self.vocabulary.clone(),
            history: self.transcript.with(user_message.clone()),
        };

        let output = match orchestrator.practice_turn(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(scenario = %self.scenario_id, error = %e, "Turn failed; transcript unchanged");
                return Err(e);
            }
        };

        self.transcript.push(user_message);
        self.transcript.push(DialogueMessage::model(
            output.response.farsi.clone(),
            output.response.finglish.clone(),
        ));
        if let Some(evaluation) = &output.evaluation {
            self.evaluation = Some(evaluation.clone());
            self.status = SessionStatus::Complete;
            info!(scenario = %self.scenario_id, turns = self.transcript.len(), "Objective met; session complete");
        }
        Ok(output)
    }

    /// Abandons the conversation and grades it without generating another turn.
    ///
    /// The session reads `Evaluating` while the evaluation is awaited. If the
    /// call fails, or the future is dropped before it resolves, it is `Active`
    /// again.
    pub async fn give_up(
        &mut self,
        orchestrator: &ConversationOrchestrator,
    ) -> PracticeResult<&Evaluation> {
        self.require(SessionStatus::Active, "give up")?;

        let input = EvaluateConversationInput {
            persona_name: self.persona.name.clone(),
            objective: self.objective.clone(),
            history: self.transcript.clone(),
        };
        let guard = EvaluatingGuard::enter(&mut self.status);
        match orchestrator.evaluate_abandoned(input).await {
            Ok(evaluation) => {
                guard.complete();
                info!(scenario = %self.scenario_id, turns = self.transcript.len(), "Session abandoned and evaluated");
                Ok(self.evaluation.insert(evaluation))
            }
            Err(e) => {
                drop(guard);
                warn!(scenario = %self.scenario_id, error = %e, "Evaluation failed; session still active");
                Err(e)
            }
        }
    }

    /// A fresh, unstarted session for the same scenario with a newly drawn objective.
    pub fn restart<R: Rng + ?Sized>(
        &self,
        registry: &ScenarioRegistry,
        rng: &mut R,
    ) -> PracticeResult<Self> {
        self.require(SessionStatus::Complete, "restart")?;
        let scenario = registry.get(&self.scenario_id)?;
        Self::new(scenario, rng, self.vocabulary.clone())
    }
}

/// Holds a session in `Evaluating` and puts it back to `Active` on drop unless
/// the evaluation completed.
struct EvaluatingGuard<'a> {
    status: &'a mut SessionStatus,
    completed: bool,
}

impl<'a> EvaluatingGuard<'a> {
    fn enter(status: &'a mut SessionStatus) -> Self {
        *status = SessionStatus::Evaluating;
        Self {
            status,
            completed: false,
        }
    }

    fn complete(mut self) {
        *self.status = SessionStatus::Complete;
        self.completed = true;
    }
}

impl Drop for EvaluatingGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            *self.status = SessionStatus::Active;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::sample_evaluation;
    use crate::evaluator::{EvaluationGenerator, EvaluationRequest};
    use crate::orchestrator::DEFAULT_GENERATION_TIMEOUT;
    use crate::turn::{TurnGenerator, TurnReply, TurnRequest};
    use async_trait::async_trait;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Meets the restaurant objective only when the latest message orders both
    /// a dish and a drink.
    struct WaiterTurns {
        fail: bool,
    }

    #[async_trait]
    impl TurnGenerator for WaiterTurns {
        async fn generate_turn(&self, request: &TurnRequest) -> PracticeResult<TurnReply> {
            if self.fail {
                return Err(PracticeError::generation("Failed to generate a conversation response."));
            }
            let latest = request.transcript.last().unwrap().content.to_lowercase();
            let objective_met = latest.contains("kabab") && latest.contains("doogh");
            Ok(TurnReply {
                farsi: if objective_met { "چشم، الان میارم." } else { "بفرمایید، منو اینجاست." }.to_string(),
                finglish: if objective_met { "Cheshm, alan miaaram." } else { "Befarmaayin, menu injaast." }.to_string(),
                objective_met,
            })
        }
    }

    #[derive(Default)]
    struct RecordingEvaluator {
        calls: Mutex<Vec<EvaluationRequest>>,
        fail: bool,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl EvaluationGenerator for RecordingEvaluator {
        async fn generate_evaluation(&self, request: &EvaluationRequest) -> PracticeResult<Evaluation> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err(PracticeError::generation("no structured output"));
            }
            Ok(sample_evaluation())
        }
    }

    fn setup(
        turns_fail: bool,
        eval_fail: bool,
    ) -> (PracticeSession, ConversationOrchestrator, Arc<RecordingEvaluator>) {
        let registry = ScenarioRegistry::builtin();
        let scenario = registry.get("restaurant").unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let session = PracticeSession::new(scenario, &mut rng, vec![]).unwrap();

        let evaluator = Arc::new(RecordingEvaluator {
            fail: eval_fail,
            ..Default::default()
        });
        let orchestrator = ConversationOrchestrator::new(
            Arc::new(WaiterTurns { fail: turns_fail }),
            evaluator.clone(),
            DEFAULT_GENERATION_TIMEOUT,
        );
        (session, orchestrator, evaluator)
    }

    #[test]
    fn test_new_session_is_not_started() {
        let (mut session, _, _) = setup(false, false);
        assert_eq!(session.status(), SessionStatus::NotStarted);
        assert!(session.transcript().is_empty());
        assert_eq!(session.persona().name, "Alireza");

        let opening = session.begin().unwrap().clone();
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.transcript().messages(), &[opening]);
        assert!(matches!(session.begin(), Err(PracticeError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_message_before_begin_is_rejected() {
        let (mut session, orchestrator, _) = setup(false, false);
        let err = session.send_user_message("salaam", &orchestrator).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid session state: cannot send a message while not_started"
        );
    }

    #[tokio::test]
    async fn test_greeting_only_keeps_conversation_going() {
        let (mut session, orchestrator, evaluator) = setup(false, false);
        session.begin().unwrap();
        let before = session.transcript().clone();

        let output = session.send_user_message("salaam agha", &orchestrator).await.unwrap();
        assert!(!output.is_complete);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.transcript().len(), before.len() + 2);
        assert_eq!(&session.transcript().messages()[..before.len()], before.messages());
        assert!(evaluator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ordering_both_completes_with_single_evaluation() {
        let (mut session, orchestrator, evaluator) = setup(false, false);
        session.begin().unwrap();
        session.send_user_message("salaam", &orchestrator).await.unwrap();

        let output = session
            .send_user_message("ye chelo kabab va ye doogh mikhaam", &orchestrator)
            .await
            .unwrap();
        assert!(output.is_complete);
        assert_eq!(session.status(), SessionStatus::Complete);
        assert_eq!(session.transcript().len(), 5);
        assert_eq!(session.evaluation(), Some(&sample_evaluation()));

        let calls = evaluator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].objective_met);
        assert_eq!(calls[0].transcript, *session.transcript());
        drop(calls);

        assert!(session.send_user_message("mersi", &orchestrator).await.is_err());
        assert!(session.give_up(&orchestrator).await.is_err());
        assert_eq!(evaluator.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_give_up_right_after_opening() {
        let (mut session, orchestrator, evaluator) = setup(false, false);
        let opening = session.begin().unwrap().clone();

        let evaluation = session.give_up(&orchestrator).await.unwrap().clone();
        assert_eq!(evaluation, sample_evaluation());
        assert_eq!(session.status(), SessionStatus::Complete);

        let calls = evaluator.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].objective_met);
        assert_eq!(calls[0].transcript.messages(), &[opening]);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_transcript_untouched() {
        let (mut session, orchestrator, _) = setup(true, false);
        session.begin().unwrap();
        let before = session.transcript().clone();

        let err = session.send_user_message("salaam", &orchestrator).await.unwrap_err();
        assert!(matches!(err, PracticeError::Generation(_)));
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.transcript(), &before);
    }

    #[tokio::test]
    async fn test_failed_evaluation_after_objective_met_is_atomic() {
        let (mut session, orchestrator, _) = setup(false, true);
        session.begin().unwrap();

        let err = session
            .send_user_message("kabab va doogh lotfan", &orchestrator)
            .await
            .unwrap_err();
        assert!(matches!(err, PracticeError::Generation(_)));
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.transcript().len(), 1);
        assert!(session.evaluation().is_none());
    }

    #[tokio::test]
    async fn test_failed_give_up_returns_to_active() {
        let (mut session, orchestrator, _) = setup(false, true);
        session.begin().unwrap();

        assert!(session.give_up(&orchestrator).await.is_err());
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_give_up_returns_to_active() {
        let registry = ScenarioRegistry::builtin();
        let scenario = registry.get("restaurant").unwrap();
        let mut session =
            PracticeSession::new(scenario, &mut StdRng::seed_from_u64(1), vec![]).unwrap();
        let evaluator = Arc::new(RecordingEvaluator {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let orchestrator = ConversationOrchestrator::new(
            Arc::new(WaiterTurns { fail: false }),
            evaluator.clone(),
            DEFAULT_GENERATION_TIMEOUT,
        );
        session.begin().unwrap();

        let dropped =
            tokio::time::timeout(Duration::from_millis(20), session.give_up(&orchestrator)).await;
        assert!(dropped.is_err());
        assert_eq!(session.status(), SessionStatus::Active);
        assert!(session.evaluation().is_none());
        assert_eq!(session.transcript().len(), 1);

        let reply = session.send_user_message("salaam", &orchestrator).await.unwrap();
        assert!(!reply.is_complete);
        assert_eq!(session.status(), SessionStatus::Active);
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected() {
        let (mut session, orchestrator, _) = setup(false, false);
        session.begin().unwrap();
        let err = session.send_user_message("   ", &orchestrator).await.unwrap_err();
        assert!(matches!(err, PracticeError::InvalidInput(_)));
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_restart_only_after_completion() {
        let registry = ScenarioRegistry::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        let (mut session, orchestrator, _) = setup(false, false);
        assert!(session.restart(&registry, &mut rng).is_err());

        session.begin().unwrap();
        session.give_up(&orchestrator).await.unwrap();

        let fresh = session.restart(&registry, &mut rng).unwrap();
        assert_eq!(fresh.status(), SessionStatus::NotStarted);
        assert_eq!(fresh.scenario_id(), "restaurant");
        assert!(fresh.transcript().is_empty());
        assert!(fresh.evaluation().is_none());
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&SessionStatus::NotStarted).unwrap(), "\"not_started\"");
        assert_eq!(SessionStatus::Evaluating.as_str(), "evaluating");
    }
}
