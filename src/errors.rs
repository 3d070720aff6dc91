use crate::{publisher::PublishReport, store::StoreError};

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("malformed timestamp {value:?}: {reason}")]
    MalformedTimestamp { value: String, reason: String },

    #[error("invalid bookmarks document: {0}")]
    InvalidDocument(#[from] serde_json::Error),

    #[error("store unavailable while trying to {action} {target}: {source}")]
    StoreUnavailable {
        action: &'static str,
        target: String,
        #[source]
        source: StoreError,
    },

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("unknown generation {0}")]
    UnknownGeneration(String),

    #[error(
        "alias {alias} was removed from [{}] but could not be bound to {generation}: {source}",
        removed.join(", ")
    )]
    PartialSwap {
        alias: String,
        generation: String,
        removed: Vec<String>,
        #[source]
        source: StoreError,
    },

    #[error(
        "indexing of generation {} aborted after {} of {} submitted entries failed",
        report.generation,
        report.failures.len(),
        report.submitted
    )]
    IndexingAborted { report: Box<PublishReport> },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Wraps a store failure with the operation and the index it targeted.
    pub fn store(action: &'static str, target: impl Into<String>, source: StoreError) -> Self {
        match source {
            StoreError::NotFound(name) => Self::NotFound {
                kind: "index",
                name,
            },
            source => Self::StoreUnavailable {
                action,
                target: target.into(),
                source,
            },
        }
    }
}
