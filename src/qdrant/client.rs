//! HTTP client wrapper for interacting with Qdrant.

use crate::config::Config;
use crate::processing::batch::Batch;
use crate::qdrant::{
    payload::{
        RecordShape, build_payload, compute_chunk_hash, current_timestamp_rfc3339,
        generate_point_id,
    },
    types::{GroupsResponse, PointGroup, QdrantError, ScoredPoint, ScrollResponse, StoredPoint},
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};

const SCROLL_PAGE_SIZE: usize = 512;
const HNSW_M: u64 = 16;
const HNSW_EF_CONSTRUCT: u64 = 200;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a client for an explicit base URL.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder().user_agent("docloader/0.1").build()?;
        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Construct a client using the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, QdrantError> {
        Self::new(&config.qdrant_url, config.qdrant_api_key.clone())
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            tracing::debug!(collection = collection_name, "Collection already present");
            return Ok(());
        }

        tracing::info!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create a cosine collection with an HNSW index of the standard shape.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            },
            "hnsw_config": {
                "m": HNSW_M,
                "ef_construct": HNSW_EF_CONSTRUCT
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection created");
        })
        .await
    }

    /// Ensure payload indexes exist for every filterable field.
    pub async fn ensure_payload_indexes(&self, collection_name: &str) -> Result<(), QdrantError> {
        let fields: [(&str, &str); 5] = [
            ("source", "keyword"),
            ("page", "integer"),
            ("category", "keyword"),
            ("reference", "keyword"),
            ("date", "keyword"),
        ];

        for (field, schema) in fields {
            let body = json!({
                "field_name": field,
                "field_schema": schema,
            });

            let response = self
                .request(Method::PUT, &format!("collections/{collection_name}/index"))
                .query(&[("wait", true)])
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index ensured"
                );
            } else if response.status() == StatusCode::CONFLICT {
                tracing::debug!(
                    collection = collection_name,
                    field,
                    schema,
                    "Payload index already exists"
                );
            } else {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(
                    collection = collection_name,
                    field,
                    schema,
                    error = %error,
                    "Failed to ensure payload index"
                );
                return Err(error);
            }
        }

        Ok(())
    }

    /// Write every row of `batch` in one request, or nothing if any row is malformed.
    pub async fn insert_batch(
        &self,
        collection_name: &str,
        batch: &Batch,
        shape: &RecordShape,
    ) -> Result<usize, QdrantError> {
        let rows = batch
            .rows()
            .map_err(|error| QdrantError::InvalidParameter(error.to_string()))?;
        for row in &rows {
            shape.check(row)?;
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let points: Vec<Value> = rows
            .iter()
            .map(|row| {
                let chunk_hash = compute_chunk_hash(row.decorated_text);
                json!({
                    "id": generate_point_id(),
                    "vector": row.embedding,
                    "payload": build_payload(row, &chunk_hash, &now),
                })
            })
            .collect();

        let point_count = points.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": points }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points inserted"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Similarity search returning the best hits grouped by `reference`.
    pub async fn search_groups(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        group_size: usize,
        limit: usize,
        filter: Option<Value>,
    ) -> Result<Vec<PointGroup>, QdrantError> {
        let mut body = Map::new();
        body.insert("query".into(), json!(vector));
        body.insert("group_by".into(), json!("reference"));
        body.insert("group_size".into(), json!(group_size));
        body.insert("limit".into(), json!(limit));
        body.insert("with_payload".into(), json!(true));
        if let Some(filter_value) = filter {
            body.insert("filter".into(), filter_value);
        }

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query/groups"),
            )
            .json(&Value::Object(body))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Grouped search failed");
            return Err(error);
        }

        let payload: GroupsResponse = response.json().await?;
        Ok(payload
            .result
            .groups
            .into_iter()
            .map(|group| PointGroup {
                reference: stringify_point_id(group.id),
                hits: group
                    .hits
                    .into_iter()
                    .map(|point| ScoredPoint {
                        id: stringify_point_id(point.id),
                        score: point.score,
                        payload: point.payload,
                    })
                    .collect(),
            })
            .collect())
    }

    /// Scroll every stored point matching `filter`, following pagination to the end.
    pub async fn scroll_points(
        &self,
        collection: &str,
        filter: Option<Value>,
    ) -> Result<Vec<StoredPoint>, QdrantError> {
        let mut offset: Option<Value> = None;
        let mut results = Vec::new();
        let filter_body = filter.unwrap_or_else(|| json!({ "must": [] }));

        loop {
            let mut body = Map::new();
            body.insert("with_payload".into(), json!(true));
            body.insert("with_vector".into(), json!(false));
            body.insert("limit".into(), json!(SCROLL_PAGE_SIZE));
            body.insert("filter".into(), filter_body.clone());
            if let Some(next) = offset.take() {
                body.insert("offset".into(), next);
            }

            let response = self
                .request(
                    Method::POST,
                    &format!("collections/{collection}/points/scroll"),
                )
                .json(&Value::Object(body))
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection, error = %error, "Failed to scroll points");
                return Err(error);
            }

            let ScrollResponse { result } = response.json().await?;
            for point in result.points {
                if let (Some(id), Some(payload)) = (point.id, point.payload) {
                    results.push(StoredPoint {
                        id: stringify_point_id(id),
                        payload,
                    });
                }
            }

            match result.next_page_offset {
                Some(Value::Null) | None => break,
                Some(next) => offset = Some(next),
            }
        }

        Ok(results)
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(
                    collection = collection_name,
                    error = %error,
                    "Collection existence check failed"
                );
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
