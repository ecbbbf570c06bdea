//! Helpers for constructing, hashing, and validating Qdrant payloads.

use crate::processing::batch::BatchRow;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

use super::types::QdrantError;

/// Maximum character length of each string field in a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    /// `source` limit.
    pub source: usize,
    /// `category` limit.
    pub category: usize,
    /// `decorated_text` limit.
    pub decorated_text: usize,
    /// `reference` limit.
    pub reference: usize,
    /// `date` limit.
    pub date: usize,
    /// Required embedding length.
    pub dimension: usize,
}

impl RecordShape {
    /// Standard field limits with the given text ceiling and vector dimension.
    pub const fn new(decorated_text: usize, dimension: usize) -> Self {
        Self {
            source: 255,
            category: 50,
            decorated_text,
            reference: 255,
            date: 50,
            dimension,
        }
    }

    /// Check one row against the shape, naming the first offending field.
    pub fn check(&self, row: &BatchRow<'_>) -> Result<(), QdrantError> {
        let fields = [
            ("source", row.source, self.source),
            ("category", row.category, self.category),
            ("decorated_text", row.decorated_text, self.decorated_text),
            ("reference", row.reference, self.reference),
            ("date", row.date, self.date),
        ];
        for (field, value, limit) in fields {
            let length = value.chars().count();
            if length > limit {
                return Err(QdrantError::InvalidParameter(format!(
                    "{field} length {length} exceeds max length {limit}"
                )));
            }
        }
        if row.embedding.len() != self.dimension {
            return Err(QdrantError::InvalidParameter(format!(
                "embedding dimension {} does not match collection dimension {}",
                row.embedding.len(),
                self.dimension
            )));
        }
        Ok(())
    }
}

/// Build the payload object stored alongside each passage.
pub(crate) fn build_payload(row: &BatchRow<'_>, chunk_hash: &str, ingested_at: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("source".into(), Value::String(row.source.to_string()));
    payload.insert("page".into(), Value::from(row.page));
    payload.insert("category".into(), Value::String(row.category.to_string()));
    payload.insert(
        "decorated_text".into(),
        Value::String(row.decorated_text.to_string()),
    );
    payload.insert("reference".into(), Value::String(row.reference.to_string()));
    payload.insert("date".into(), Value::String(row.date.to_string()));
    payload.insert("chunk_hash".into(), Value::String(chunk_hash.to_string()));
    payload.insert("ingested_at".into(), Value::String(ingested_at.to_string()));
    Value::Object(payload)
}

/// Compute a deterministic SHA-256 hash for the chunk text.
pub fn compute_chunk_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier suitable for a Qdrant point.
pub(crate) fn generate_point_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(decorated_text: &'a str, embedding: &'a [f32]) -> BatchRow<'a> {
        BatchRow {
            source: "AccountsataGlance2019_2020.pdf",
            page: 3,
            category: "financial_management_reports",
            embedding,
            decorated_text,
            reference: "Accounts At A Glance 2019-20",
            date: "January 2019 - January 2020",
        }
    }

    #[test]
    fn chunk_hash_is_stable() {
        let h1 = compute_chunk_hash("Hello world");
        let h2 = compute_chunk_hash("Hello world");
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_carries_every_column() {
        let payload = build_payload(&row("text", &[0.0]), "abc123", "2025-01-01T00:00:00Z");
        assert_eq!(payload["source"], "AccountsataGlance2019_2020.pdf");
        assert_eq!(payload["page"], 3);
        assert_eq!(payload["category"], "financial_management_reports");
        assert_eq!(payload["decorated_text"], "text");
        assert_eq!(payload["reference"], "Accounts At A Glance 2019-20");
        assert_eq!(payload["date"], "January 2019 - January 2020");
        assert_eq!(payload["chunk_hash"], "abc123");
        assert_eq!(payload["ingested_at"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn shape_accepts_rows_at_the_limit() {
        let text = "a".repeat(8192);
        assert!(RecordShape::new(8192, 2).check(&row(&text, &[0.1, 0.2])).is_ok());
    }

    #[test]
    fn shape_rejects_oversize_text_and_wrong_dimension() {
        let text = "a".repeat(8193);
        let error = RecordShape::new(8192, 2)
            .check(&row(&text, &[0.1, 0.2]))
            .unwrap_err();
        let QdrantError::InvalidParameter(message) = &error else {
            panic!("expected a parameter error, got {error:?}");
        };
        assert!(message.starts_with("decorated_text"));

        let error = RecordShape::new(8192, 3)
            .check(&row("short", &[0.1, 0.2]))
            .unwrap_err();
        assert!(error.is_parameter_error());
    }

    #[test]
    fn shape_counts_characters_not_bytes() {
        let mut shaped = row("ok", &[0.0]);
        let date = "é".repeat(50);
        shaped.date = &date;
        assert!(RecordShape::new(8192, 1).check(&shaped).is_ok());
    }
}
