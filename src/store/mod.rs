//! Document store seam.
//!
//! The publisher and alias registry only talk to the search engine through
//! [`DocumentStore`]; `elastic` provides the HTTP implementation.

pub mod elastic;

use std::collections::BTreeMap;

pub use elastic::ElasticStore;

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("reqwest error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid endpoint {0}")]
    InvalidEndpoint(String),
}

impl StoreError {
    /// Transport failures and server side errors may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            StoreError::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The request never reached the server.
    pub fn is_connect(&self) -> bool {
        matches!(self, StoreError::Http(err) if err.is_connect())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Index name to the aliases bound to it.
pub type AliasTable = BTreeMap<String, Vec<String>>;

pub trait DocumentStore: Send + Sync {
    fn index_exists(&self, index: &str) -> StoreResult<bool>;
    fn create_index(&self, index: &str) -> StoreResult<()>;
    fn index_document(
        &self,
        index: &str,
        doc_type: &str,
        body: &serde_json::Value,
    ) -> StoreResult<()>;
    fn delete_index(&self, index: &str) -> StoreResult<()>;
    fn index_names(&self) -> StoreResult<Vec<String>>;
    fn list_aliases(&self) -> StoreResult<AliasTable>;
    fn add_alias(&self, index: &str, alias: &str) -> StoreResult<bool>;
    fn remove_alias(&self, index: &str, alias: &str) -> StoreResult<bool>;
    fn count(&self, index: &str) -> StoreResult<u64>;
    fn health(&self) -> StoreResult<serde_json::Value>;
    fn version(&self) -> StoreResult<String>;
}
