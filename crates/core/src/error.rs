use std::time::Duration;

/// Failures surfaced by the practice flow.
///
/// `InvalidInput` is raised before any remote call is attempted. `Generation`
/// and `Timeout` are fatal to the single turn or evaluation that produced them;
/// the session they belong to does not advance.
#[derive(Debug, thiserror::Error)]
pub enum PracticeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Invalid session state: cannot {action} while {status}")]
    InvalidState {
        action: &'static str,
        status: &'static str,
    },
    #[error("Unknown scenario: '{0}'")]
    UnknownScenario(String),
}

impl PracticeError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn generation(msg: impl std::fmt::Display) -> Self {
        Self::Generation(anyhow::anyhow!("{}", msg))
    }
}

pub type PracticeResult<T> = Result<T, PracticeError>;
