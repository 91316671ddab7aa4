//! Document contract (§3) — a single ingested artifact. Immutable to the
//! engine: it is produced by ingestion and the engine never mutates it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::EngineError;

/// Closed enumeration — a value outside this set fails contract validation
/// (§4.1, §8 property 1) rather than being coerced or widened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Note,
    Document,
    Decision,
    Conversation,
    Task,
    Signal,
    Playbook,
    CaseStudy,
    Transcript,
}

impl FromStr for KnowledgeType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "note" => Ok(Self::Note),
            "document" => Ok(Self::Document),
            "decision" => Ok(Self::Decision),
            "conversation" => Ok(Self::Conversation),
            "task" => Ok(Self::Task),
            "signal" => Ok(Self::Signal),
            "playbook" => Ok(Self::Playbook),
            "case_study" => Ok(Self::CaseStudy),
            "transcript" => Ok(Self::Transcript),
            other => Err(EngineError::ContractViolation(format!(
                "unknown knowledge_type '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOrigin {
    Notion,
    Obsidian,
    Email,
    Manual,
    Youtube,
    Web,
    Other,
}

impl FromStr for SourceOrigin {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notion" => Ok(Self::Notion),
            "obsidian" => Ok(Self::Obsidian),
            "email" => Ok(Self::Email),
            "manual" => Ok(Self::Manual),
            "youtube" => Ok(Self::Youtube),
            "web" => Ok(Self::Web),
            "other" => Ok(Self::Other),
            other => Err(EngineError::ContractViolation(format!(
                "unknown source_origin '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub knowledge_type: KnowledgeType,
    pub source_origin: SourceOrigin,
    pub source_url: Option<String>,
    pub author: Option<String>,
    pub raw_content: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub ingested_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Construct a document from loosely-typed ingestion input, validating
    /// the closed enumerations. This is the only place a raw `&str` is
    /// allowed to become a `KnowledgeType`/`SourceOrigin` — everywhere else
    /// in the engine they are passed around as the typed enum.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Uuid,
        title: impl Into<String>,
        knowledge_type: &str,
        source_origin: &str,
        source_url: Option<String>,
        author: Option<String>,
        raw_content: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
        ingested_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            id,
            title: title.into(),
            knowledge_type: knowledge_type.parse()?,
            source_origin: source_origin.parse()?,
            source_url,
            author,
            raw_content,
            metadata,
            ingested_at,
            created_at,
            updated_at,
        })
    }
}
