//! Goftogu Core
//!
//! Conversation practice for Farsi learners: roleplay scenarios, an LLM-driven
//! persona that detects when the learner has met their objective, and a
//! post-conversation evaluation.

pub mod dialogue;
pub mod error;
pub mod evaluation;
pub mod evaluator;
pub mod llm_client;
pub mod orchestrator;
pub mod prompts;
pub mod scenario;
pub mod session;
pub mod turn;
pub mod vocabulary;

pub use error::{PracticeError, PracticeResult};
