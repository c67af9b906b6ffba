//! Error types for the pipeline service
//!
//! - Transport failures reaching the persistence collaborator
//! - Ingestion failures at the wire boundary
//! - The combined [`PipelineError`] returned by single-record operations

use leadflow_model::ProspectId;
use leadflow_workflow::WorkflowError;

/// Failure reaching the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response
    #[error("server responded {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response message
        message: String,
    },

    /// Body could not be read
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Server-side failure worth retrying
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status { code, .. } => *code >= 500 || *code == 429,
            Self::Decode(_) => false,
        }
    }
}

/// Wire data that cannot be turned into model records
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Body was neither an array nor the expected envelope
    #[error("expected an array or {{\"{key}\": [...]}} envelope")]
    UnexpectedShape {
        /// Envelope key that was looked for
        key: &'static str,
    },

    /// Required field missing or empty
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Timestamp in neither ISO nor `{_seconds}` form
    #[error("invalid timestamp: {0}")]
    BadTimestamp(String),

    /// Unparseable date or time of day
    #[error("invalid {field}: '{value}'")]
    BadValue {
        /// Field name
        field: &'static str,
        /// Offending text
        value: String,
    },

    /// JSON did not match the record shape
    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Rejected by the workflow
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Persistence round-trip failed; local edits are intact
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// Response could not be ingested
    #[error("ingest failed: {0}")]
    Ingest(#[from] IngestError),

    /// No signed-in user
    #[error("no active session")]
    NoSession,

    /// A save for this prospect is already running
    #[error("save already in progress for prospect {0}")]
    SaveInProgress(ProspectId),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::SaveInProgress(_) => true,
            _ => false,
        }
    }

    /// Permission guard refused the operation
    #[inline]
    #[must_use]
    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Workflow(e) if e.is_permission())
    }
}
