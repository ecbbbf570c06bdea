//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// A row does not fit the collection's record shape; nothing was written.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl QdrantError {
    /// Whether the error is a rejected record rather than an infrastructure failure.
    pub fn is_parameter_error(&self) -> bool {
        match self {
            Self::InvalidParameter(_) => true,
            Self::UnexpectedStatus { status, .. } => *status == StatusCode::BAD_REQUEST,
            _ => false,
        }
    }
}

/// Equality filters accepted by the search helpers.
#[derive(Debug, Default, Clone)]
pub struct SearchFilterArgs {
    /// Exact match on the `reference` payload field.
    pub reference: Option<String>,
    /// Exact match on the `page` payload field.
    pub page: Option<u32>,
    /// Match any of these `date` values.
    pub dates: Option<Vec<String>>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

/// Hits sharing one `reference` value.
#[derive(Debug, Clone)]
pub struct PointGroup {
    /// Group key, i.e. the reference title.
    pub reference: String,
    /// Best hits within the group, highest score first.
    pub hits: Vec<ScoredPoint>,
}

/// Stored passage returned by payload lookups.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Payload stored with the vector.
    pub payload: Map<String, Value>,
}

#[derive(Deserialize)]
pub(crate) struct GroupsResponse {
    pub(crate) result: GroupsResult,
}

#[derive(Deserialize)]
pub(crate) struct GroupsResult {
    #[serde(default)]
    pub(crate) groups: Vec<GroupEntry>,
}

#[derive(Deserialize)]
pub(crate) struct GroupEntry {
    pub(crate) id: Value,
    #[serde(default)]
    pub(crate) hits: Vec<QueryPoint>,
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<ScrollPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollPoint {
    #[serde(default)]
    pub(crate) id: Option<Value>,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
