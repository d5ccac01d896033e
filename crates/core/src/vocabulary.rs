//! Vocabulary Provider
//!
//! The practice flow grounds its Farsi in terms the learner already knows.
//! Those terms come from the content library, which is owned elsewhere; this
//! module only reads it and flattens the relevant items into prompt lines.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Published,
}

/// A line of a scripted dialogue in the content library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    #[serde(default)]
    pub speaker: Option<String>,
    pub english: String,
    pub finglish: String,
    pub farsi: String,
}

/// An item of the content library, discriminated by its `type` field.
///
/// Fields that the practice flow never reads (tags, lessons, audio, verb
/// conjugations) are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    Word {
        english: String,
        farsi: String,
        finglish: String,
        status: PublishStatus,
    },
    Phrase {
        english: String,
        farsi: String,
        finglish: String,
        status: PublishStatus,
    },
    Verb {
        english: String,
        farsi: String,
        finglish: String,
        status: PublishStatus,
    },
    CulturalNote {
        title: String,
        content: String,
        status: PublishStatus,
    },
    Dialogue {
        title: String,
        dialogue: Vec<DialogueLine>,
        status: PublishStatus,
    },
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        let status = match self {
            ContentItem::Word { status, .. }
            | ContentItem::Phrase { status, .. }
            | ContentItem::Verb { status, .. }
            | ContentItem::CulturalNote { status, .. }
            | ContentItem::Dialogue { status, .. } => status,
        };
        *status == PublishStatus::Published
    }

    /// Formats the item as a vocabulary line, if it is a translatable term.
    pub fn vocabulary_line(&self) -> Option<String> {
        match self {
            ContentItem::Word {
                english,
                farsi,
                finglish,
                ..
            }
            | ContentItem::Phrase {
                english,
                farsi,
                finglish,
                ..
            }
            | ContentItem::Verb {
                english,
                farsi,
                finglish,
                ..
            } => Some(format!(
                "English: {} - Farsi: {} - Finglish: {}",
                english, farsi, finglish
            )),
            ContentItem::CulturalNote { .. } | ContentItem::Dialogue { .. } => None,
        }
    }
}

/// Flattens published translatable items into vocabulary lines, preserving order.
pub fn vocabulary_from_items(items: &[ContentItem]) -> Vec<String> {
    items
        .iter()
        .filter(|item| item.is_published())
        .filter_map(ContentItem::vocabulary_line)
        .collect()
}

/// Defines the contract for any source of known vocabulary.
#[async_trait]
pub trait VocabularyProvider: Send + Sync {
    /// Lists the terms the learner has studied, one formatted line per term.
    async fn list_vocabulary(&self) -> Result<Vec<String>>;
}

/// A provider backed by an in-memory list of content items.
pub struct StaticVocabularyProvider {
    items: Vec<ContentItem>,
}

impl StaticVocabularyProvider {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    /// A provider that knows no vocabulary.
    pub fn empty() -> Self {
        Self { items: vec![] }
    }
}

#[async_trait]
impl VocabularyProvider for StaticVocabularyProvider {
    async fn list_vocabulary(&self) -> Result<Vec<String>> {
        Ok(vocabulary_from_items(&self.items))
    }
}

/// A provider that reads a JSON array of content items from disk on every call,
/// so edits to the export are picked up without a restart.
pub struct JsonFileVocabularyProvider {
    path: PathBuf,
}

impl JsonFileVocabularyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VocabularyProvider for JsonFileVocabularyProvider {
    async fn list_vocabulary(&self) -> Result<Vec<String>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read vocabulary file {}", self.path.display()))?;
        let items: Vec<ContentItem> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid content items in {}", self.path.display()))?;
        let vocabulary = vocabulary_from_items(&items);
        debug!(path = %self.path.display(), items = items.len(), terms = vocabulary.len(), "Loaded vocabulary");
        Ok(vocabulary)
    }
}
