//! Core data models for one analytics request

use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Analytics,
    Chat,
}

impl Intent {
    /// Anything other than the exact analytics literal is chat.
    pub fn from_literal(literal: &str) -> Self {
        match literal.trim().to_lowercase().as_str() {
            "analytics" => Intent::Analytics,
            _ => Intent::Chat,
        }
    }
}

//
// ================= Pipeline =================
//

/// Stage operators the store may receive. Spelling is the store's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageOperator {
    Match,
    Lookup,
    Unwind,
    Group,
    Sum,
    Sort,
    Limit,
    AddToSet,
    Project,
}

impl StageOperator {
    pub const ALL: [StageOperator; 9] = [
        StageOperator::Match,
        StageOperator::Lookup,
        StageOperator::Unwind,
        StageOperator::Group,
        StageOperator::Sum,
        StageOperator::Sort,
        StageOperator::Limit,
        StageOperator::AddToSet,
        StageOperator::Project,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StageOperator::Match => "$match",
            StageOperator::Lookup => "$lookup",
            StageOperator::Unwind => "$unwind",
            StageOperator::Group => "$group",
            StageOperator::Sum => "$sum",
            StageOperator::Sort => "$sort",
            StageOperator::Limit => "$limit",
            StageOperator::AddToSet => "$addToSet",
            StageOperator::Project => "$project",
        }
    }

    /// Allow-list lookup by exact key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.key() == key)
    }
}

impl fmt::Display for StageOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStage {
    pub operator: StageOperator,
    pub body: Bson,
}

impl PipelineStage {
    pub fn new(operator: StageOperator, body: impl Into<Bson>) -> Self {
        Self {
            operator,
            body: body.into(),
        }
    }

    /// `{ "<operator>": <body> }` as sent to the store
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(self.operator.key(), self.body.clone());
        doc
    }
}

/// Ordered stages; order is preserved exactly as produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<PipelineStage>) -> Self {
        Self { stages }
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn prepend(mut self, stage: PipelineStage) -> Self {
        self.stages.insert(0, stage);
        self
    }

    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(PipelineStage::to_document).collect()
    }
}

//
// ================= Results =================
//

/// One store record; no schema beyond field → value.
pub type QueryRecord = serde_json::Map<String, serde_json::Value>;

pub type QueryResult = Vec<QueryRecord>;

//
// ================= Summary =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Pie,
    Bar,
    Line,
}

impl ChartKind {
    pub fn parse(literal: &str) -> Option<Self> {
        match literal.trim().to_lowercase().as_str() {
            "pie" => Some(ChartKind::Pie),
            "bar" => Some(ChartKind::Bar),
            "line" => Some(ChartKind::Line),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Pie => "pie",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryMeta {
    pub summary: String,
    pub chart: Option<ChartKind>,
    /// Empty means no image is generated
    pub image_prompt: String,
    pub video_prompt: Option<String>,
}

/// Base64 image payload; empty means absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageArtifact(String);

impl ImageArtifact {
    pub fn none() -> Self {
        Self(String::new())
    }

    pub fn from_base64(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

//
// ================= Responses =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    pub summary: String,
    pub chart: String,
    pub image: String,
    pub data: QueryResult,
}

/// Body returned when the question is not an analytics question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectionEnvelope {
    pub summary: String,
}

/// Body returned when translation or execution fails
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureEnvelope {
    pub summary: String,
    pub error: String,
}

//
// ================= Request lifecycle =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Classified,
    Rejected,
    Translated,
    Filtered,
    Executed,
    Summarized,
    Assembled,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Rejected | RequestState::Assembled | RequestState::Failed
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestState::Received => "Received",
            RequestState::Classified => "Classified",
            RequestState::Rejected => "Rejected",
            RequestState::Translated => "Translated",
            RequestState::Filtered => "Filtered",
            RequestState::Executed => "Executed",
            RequestState::Summarized => "Summarized",
            RequestState::Assembled => "Assembled",
            RequestState::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}
