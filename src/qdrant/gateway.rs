//! Storage seam used by the ingestion pipeline.

use async_trait::async_trait;

use crate::config::Config;
use crate::processing::batch::Batch;

use super::{
    QdrantService,
    filters::{
        DEFAULT_GROUP_SIZE, build_search_filter, grouped_search_limit, reference_page_filter,
    },
    payload::RecordShape,
    types::{PointGroup, QdrantError, SearchFilterArgs, StoredPoint},
};

/// Destination for assembled batches.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Create the collection and its indexes when missing. Failures here end the run.
    async fn ensure_schema(&self) -> Result<(), QdrantError>;

    /// Insert one document's batch; either every row is written or none is.
    async fn insert(&self, batch: &Batch) -> Result<usize, QdrantError>;
}

/// [`StorageGateway`] bound to one Qdrant collection.
pub struct QdrantGateway {
    service: QdrantService,
    collection: String,
    shape: RecordShape,
}

impl QdrantGateway {
    /// Bind `service` to `collection` with the given record shape.
    pub fn new(service: QdrantService, collection: String, shape: RecordShape) -> Self {
        Self {
            service,
            collection,
            shape,
        }
    }

    /// Build a gateway from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        Ok(Self::new(
            QdrantService::from_config(config)?,
            config.qdrant_collection_name.clone(),
            RecordShape::new(config.max_record_length, config.embedding_dimension),
        ))
    }

    /// Collection receiving the passages.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Top passages for `vector`, grouped by reference with at most `group_size` hits each.
    ///
    /// The number of groups comes from `bin_size` through [`grouped_search_limit`]; pass
    /// [`DEFAULT_GROUP_SIZE`] for the usual per-reference cap.
    pub async fn search(
        &self,
        vector: Vec<f32>,
        group_size: usize,
        bin_size: usize,
        filters: &SearchFilterArgs,
    ) -> Result<Vec<PointGroup>, QdrantError> {
        let limit = grouped_search_limit(bin_size);
        tracing::debug!(
            collection = %self.collection,
            group_size,
            bin_size,
            limit,
            "Running grouped search"
        );
        self.service
            .search_groups(
                &self.collection,
                vector,
                group_size,
                limit,
                build_search_filter(filters),
            )
            .await
    }

    /// Stored passages for any of the given `(reference, page)` pairs.
    pub async fn chunks_for_reference_pages(
        &self,
        pairs: &[(String, u32)],
    ) -> Result<Vec<StoredPoint>, QdrantError> {
        let Some(filter) = reference_page_filter(pairs) else {
            return Ok(Vec::new());
        };
        self.service
            .scroll_points(&self.collection, Some(filter))
            .await
    }
}

#[async_trait]
impl StorageGateway for QdrantGateway {
    async fn ensure_schema(&self) -> Result<(), QdrantError> {
        self.service
            .create_collection_if_not_exists(&self.collection, self.shape.dimension as u64)
            .await?;
        self.service.ensure_payload_indexes(&self.collection).await?;
        tracing::debug!(collection = %self.collection, "Collection ready");
        Ok(())
    }

    async fn insert(&self, batch: &Batch) -> Result<usize, QdrantError> {
        self.service
            .insert_batch(&self.collection, batch, &self.shape)
            .await
    }
}
