// Domain errors: query dispatch (travels inside snapshots) and datasource store.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error delivered by a query dispatch stream. Carried as-is in the error snapshot.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum QueryError {
    #[error("datasource returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("datasource error: {0}")]
    Datasource(String),

    #[error("unsupported datasource type: {0}")]
    UnsupportedDatasource(String),
}

impl From<reqwest::Error> for QueryError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => QueryError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None if e.is_decode() => QueryError::Decode(e.to_string()),
            None => QueryError::Request(e.to_string()),
        }
    }
}

/// Errors from the datasource store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("datasource not found: {0}")]
    NotFound(String),

    #[error("datasource already exists: {0}")]
    AlreadyExists(String),

    #[error("datasource {uid} was modified concurrently (expected version {expected})")]
    VersionConflict { uid: String, expected: i64 },

    #[error("invalid resource version {0:?}")]
    InvalidResourceVersion(String),

    #[error("json_data serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
