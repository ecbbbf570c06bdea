//! Qdrant vector store integration.

pub mod client;
pub mod filters;
mod gateway;
pub mod payload;
pub mod types;

pub use client::QdrantService;
pub use filters::{
    DEFAULT_GROUP_SIZE, build_search_filter, grouped_search_limit, reference_page_filter,
};
pub use gateway::{QdrantGateway, StorageGateway};
pub use payload::{RecordShape, compute_chunk_hash};
pub use types::{PointGroup, QdrantError, ScoredPoint, SearchFilterArgs, StoredPoint};
