use crate::error::{PracticeError, PracticeResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const MIN_SCORE: u8 = 1;
pub const MAX_SCORE: u8 = 5;

/// Free-text feedback on a dimension that is not scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Feedback {
    pub feedback: String,
}

/// Feedback on a dimension graded from 1 to 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredFeedback {
    #[schemars(range(min = 1, max = 5))]
    pub score: u8,
    pub feedback: String,
}

/// The structured review produced once a practice session has ended.
///
/// A dimension whose feedback contains a correction is expected to score below
/// 5. That rule lives in the evaluation prompt and is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Evaluation {
    /// Whether the learner met the objective, and what they could have said instead.
    pub objective: Feedback,
    /// Use of the right level of politeness and tone.
    pub formality: ScoredFeedback,
    /// Grammar and spelling in the learner's Farsi or Finglish.
    pub grammar: ScoredFeedback,
    /// Use of, or response to, ritual politeness.
    pub taarof: Feedback,
    /// General encouragement and suggestions.
    pub overall: Feedback,
}

impl Evaluation {
    /// Rejects evaluations with out-of-range scores or empty dimensions.
    pub fn validate(&self) -> PracticeResult<()> {
        for (name, scored) in [("formality", &self.formality), ("grammar", &self.grammar)] {
            if !(MIN_SCORE..=MAX_SCORE).contains(&scored.score) {
                return Err(PracticeError::generation(format!(
                    "{} score {} is outside {}..={}",
                    name, scored.score, MIN_SCORE, MAX_SCORE
                )));
            }
        }

        let dimensions = [
            ("objective", &self.objective.feedback),
            ("formality", &self.formality.feedback),
            ("grammar", &self.grammar.feedback),
            ("taarof", &self.taarof.feedback),
            ("overall", &self.overall.feedback),
        ];
        if let Some((name, _)) = dimensions.iter().find(|(_, text)| text.trim().is_empty()) {
            return Err(PracticeError::generation(format!(
                "evaluation is missing feedback for '{}'",
                name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_evaluation() -> Evaluation {
    Evaluation {
        objective: Feedback {
            feedback: "You ordered both a main course and a drink.".to_string(),
        },
        formality: ScoredFeedback {
            score: 4,
            feedback: "Good use of 'lotfan'.\nTry 'mikhaam' rather than 'mikhaaham'.".to_string(),
        },
        grammar: ScoredFeedback {
            score: 5,
            feedback: "No errors, well done!".to_string(),
        },
        taarof: Feedback {
            feedback: "No taarof occurred in this conversation.".to_string(),
        },
        overall: Feedback {
            feedback: "Great job. 'Mersi' is very common in Tehran.".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_evaluation_passes() {
        assert!(sample_evaluation().validate().is_ok());
    }

    #[test]
    fn test_scores_outside_range_are_rejected() {
        let mut evaluation = sample_evaluation();
        evaluation.formality.score = 0;
        assert!(matches!(
            evaluation.validate(),
            Err(PracticeError::Generation(_))
        ));

        let mut evaluation = sample_evaluation();
        evaluation.grammar.score = 6;
        let err = evaluation.validate().unwrap_err();
        assert!(err.to_string().contains("grammar score 6"));
    }

    #[test]
    fn test_blank_feedback_is_rejected() {
        let mut evaluation = sample_evaluation();
        evaluation.taarof.feedback = "  ".to_string();
        let err = evaluation.validate().unwrap_err();
        assert!(err.to_string().contains("taarof"));
    }

    #[test]
    fn test_deserializes_generator_output() {
        let json = r#"{
            "objective": {"feedback": "Not met."},
            "formality": {"score": 3, "feedback": "Use -in endings."},
            "grammar": {"score": 2, "feedback": "Drop 'ast' in speech."},
            "taarof": {"feedback": "None occurred."},
            "overall": {"feedback": "Keep practicing!"}
        }"#;
        let evaluation: Evaluation = serde_json::from_str(json).unwrap();
        assert_eq!(evaluation.formality.score, 3);
        assert_eq!(evaluation.grammar.score, 2);
        assert!(evaluation.validate().is_ok());
    }

    #[test]
    fn test_missing_dimension_fails_to_parse() {
        let json = r#"{
            "objective": {"feedback": "Not met."},
            "formality": {"score": 3, "feedback": "ok"},
            "grammar": {"score": 2, "feedback": "ok"},
            "overall": {"feedback": "ok"}
        }"#;
        assert!(serde_json::from_str::<Evaluation>(json).is_err());
    }
}
