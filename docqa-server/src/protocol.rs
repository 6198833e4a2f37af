use chrono::{DateTime, Utc};
use docqa_rag::{Answer, DocumentStats, ErrorKind, IndexStatus, RagError, ScoredSegment, Stage};
use serde::{Deserialize, Serialize};

pub type SessionId = String;

/// Body of `POST /api/documents`: raw text, or base64 file content with its MIME type.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UploadRequest {
    Text {
        text: String,
        #[serde(default)]
        name: Option<String>,
    },
    Encoded {
        content_base64: String,
        mime_type: String,
        #[serde(default)]
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub session_id: SessionId,
    pub chars: usize,
    pub stats: DocumentStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResponse {
    pub segments: usize,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Body of the stateless `POST /api/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneShotAskRequest {
    pub text: String,
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePayload {
    pub index: usize,
    pub offset: usize,
    pub score: f32,
    pub text: String,
}

impl From<ScoredSegment> for SourcePayload {
    fn from(scored: ScoredSegment) -> Self {
        Self {
            index: scored.segment.index,
            offset: scored.segment.offset,
            score: scored.score,
            text: scored.segment.text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<SourcePayload>,
    /// Retrieved segments left out of the prompt to fit the input limit.
    pub dropped: usize,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            sources: answer.sources.into_iter().map(SourcePayload::from).collect(),
            dropped: answer.dropped,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IndexStatusPayload {
    Unbuilt,
    Building,
    Ready { segments: usize, dimensions: usize },
    Failed { error: ErrorPayload },
}

impl From<IndexStatus> for IndexStatusPayload {
    fn from(status: IndexStatus) -> Self {
        match status {
            IndexStatus::Unbuilt => Self::Unbuilt,
            IndexStatus::Building => Self::Building,
            IndexStatus::Ready { segments, dimensions } => Self::Ready { segments, dimensions },
            IndexStatus::Failed(error) => Self::Failed { error: ErrorPayload::from(&error) },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub chars: usize,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub index: IndexStatusPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorPayload {
    pub kind: ErrorKindName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub message: String,
    pub retryable: bool,
}

/// Wire name of an error kind; `session_not_found` exists only at the HTTP layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKindName {
    Extraction,
    EmbeddingService,
    InferenceService,
    DimensionMismatch,
    Validation,
    Config,
    SessionNotFound,
}

impl From<ErrorKind> for ErrorKindName {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Extraction => Self::Extraction,
            ErrorKind::EmbeddingService => Self::EmbeddingService,
            ErrorKind::InferenceService => Self::InferenceService,
            ErrorKind::DimensionMismatch => Self::DimensionMismatch,
            ErrorKind::Validation => Self::Validation,
            ErrorKind::Config => Self::Config,
        }
    }
}

impl From<&RagError> for ErrorPayload {
    fn from(error: &RagError) -> Self {
        Self {
            kind: error.kind().into(),
            stage: error.stage().map(|stage: Stage| stage.as_str().to_string()),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorPayload,
}
