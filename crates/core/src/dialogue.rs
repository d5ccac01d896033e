//! Conversation Primitives
//!
//! Personas, dialogue messages, and the append-only transcript that every
//! practice turn builds on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The character the AI plays for the length of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// The name of the persona (e.g., "Alireza").
    pub name: String,
    /// The role or personality of the persona (e.g., "a friendly waiter").
    pub role: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogueRole {
    User,
    Model,
}

impl fmt::Display for DialogueRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DialogueRole::User => write!(f, "user"),
            DialogueRole::Model => write!(f, "model"),
        }
    }
}

/// A single line of a practice conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueMessage {
    pub role: DialogueRole,
    /// Farsi script for model turns; whatever the learner typed for user turns.
    pub content: String,
    /// Latin transliteration, only present on model turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finglish: Option<String>,
}

impl DialogueMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: DialogueRole::User,
            content: content.into(),
            finglish: None,
        }
    }

    pub fn model(content: impl Into<String>, finglish: impl Into<String>) -> Self {
        Self {
            role: DialogueRole::Model,
            content: content.into(),
            finglish: Some(finglish.into()),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == DialogueRole::User
    }
}

/// An ordered, append-only record of a conversation.
///
/// Messages can be pushed but never edited or removed once inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<DialogueMessage>);

impl Transcript {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, message: DialogueMessage) {
        self.0.push(message);
    }

    /// Returns a copy of this transcript with `message` appended.
    pub fn with(&self, message: DialogueMessage) -> Self {
        let mut next = self.clone();
        next.push(message);
        next
    }

    pub fn messages(&self) -> &[DialogueMessage] {
        &self.0
    }

    pub fn last(&self) -> Option<&DialogueMessage> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Splits off the final message, returning it with everything before it.
    pub fn split_last(&self) -> Option<(&DialogueMessage, &[DialogueMessage])> {
        self.0.split_last()
    }
}

impl From<Vec<DialogueMessage>> for Transcript {
    fn from(messages: Vec<DialogueMessage>) -> Self {
        Self(messages)
    }
}

impl IntoIterator for Transcript {
    type Item = DialogueMessage;
    type IntoIter = std::vec::IntoIter<DialogueMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a DialogueMessage;
    type IntoIter = std::slice::Iter<'a, DialogueMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
