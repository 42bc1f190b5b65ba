//! Error taxonomy shared by every layer

use thiserror::Error;

/// Client-facing failures plus an opaque storage bucket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KgError {
    #[error("{0}")]
    Validation(String),

    #[error("Graph {0} not found")]
    GraphNotFound(String),

    #[error("Course {0} not found")]
    CourseNotFound(i64),

    #[error("Topic {0} not found")]
    TopicNotFound(String),

    #[error("Edge from {parent} to {child} not found")]
    EdgeNotFound { parent: String, child: String },

    #[error("{0}")]
    DuplicateEntry(String),

    #[error("Cannot modify read-only graph")]
    ReadonlyGraph,

    #[error("Cannot delete default graph")]
    CannotDeleteDefault,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl KgError {
    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            KgError::Validation(_) => "VALIDATION_ERROR",
            KgError::GraphNotFound(_) => "GRAPH_NOT_FOUND",
            KgError::CourseNotFound(_) => "COURSE_NOT_FOUND",
            KgError::TopicNotFound(_) => "TOPIC_NOT_FOUND",
            KgError::EdgeNotFound { .. } => "EDGE_NOT_FOUND",
            KgError::DuplicateEntry(_) => "DUPLICATE_ENTRY",
            KgError::ReadonlyGraph => "READONLY_GRAPH",
            KgError::CannotDeleteDefault => "CANNOT_DELETE_DEFAULT",
            KgError::Storage(_) => "INTERNAL_ERROR",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        KgError::Validation(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            KgError::GraphNotFound(_)
                | KgError::CourseNotFound(_)
                | KgError::TopicNotFound(_)
                | KgError::EdgeNotFound { .. }
        )
    }
}

pub type KgResult<T> = Result<T, KgError>;
