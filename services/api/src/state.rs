//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the scenario
//! catalogue, live sessions, and the services every handler needs.

use crate::store::SessionStore;
use goftogu_core::{
    orchestrator::ConversationOrchestrator, scenario::ScenarioRegistry,
    vocabulary::VocabularyProvider,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ScenarioRegistry>,
    pub sessions: SessionStore,
    pub orchestrator: Arc<ConversationOrchestrator>,
    pub vocabulary: Arc<dyn VocabularyProvider>,
}
