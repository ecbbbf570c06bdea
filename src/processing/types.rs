//! Core data types and error definitions for the ingestion pipeline.

use crate::{
    embedding::EmbeddingClientError, ocr::OcrError, qdrant::QdrantError,
    reference::ReferenceMapError,
};
use std::time::Duration;
use thiserror::Error;

use super::batch::BatchError;

/// Errors produced while re-splitting segment text.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible sub-chunk size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Reasons a single document is skipped. None of these stop the run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The source file could not be read.
    #[error("failed to read document: {0}")]
    Read(#[from] std::io::Error),
    /// The OCR call failed.
    #[error("OCR extraction failed: {0}")]
    Extraction(#[from] OcrError),
    /// OCR succeeded but returned no pages.
    #[error("OCR returned no pages")]
    NoPages,
    /// Segmentation and bounding left nothing to store.
    #[error("no content extracted")]
    EmptyContent,
    /// Re-splitting was misconfigured.
    #[error("failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// The embedding provider failed or returned a malformed vector.
    #[error("failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Column lengths disagreed; nothing was written.
    #[error(transparent)]
    Batch(#[from] BatchError),
    /// The storage gateway rejected the batch.
    #[error("storage rejected batch: {0}")]
    Storage(#[from] QdrantError),
}

/// Infrastructure failures that end the whole run.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The OCR client could not be built.
    #[error("failed to initialize OCR client: {0}")]
    Ocr(#[from] OcrError),
    /// The embedding client could not be built.
    #[error("failed to initialize embedding client: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Storage was unreachable or the schema could not be created.
    #[error("failed to prepare storage: {0}")]
    Storage(#[from] QdrantError),
    /// The reference map could not be loaded.
    #[error(transparent)]
    ReferenceMap(#[from] ReferenceMapError),
    /// The input directory could not be listed.
    #[error("failed to list input directory: {0}")]
    Discovery(#[from] walkdir::Error),
}

/// One page of OCR output; `page_number` is 1-indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Physical page number, starting at 1.
    pub page_number: u32,
    /// Markdown text recognized on the page.
    pub raw_text: String,
}

/// Final unit submitted for embedding and storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Segment or sub-segment text.
    pub text: String,
    /// Page the text came from.
    pub page_number: u32,
    /// Text prefixed with the reference/page preamble; this is what gets embedded and stored.
    pub decorated_text: String,
}

/// Metadata shared by every chunk of one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    /// Source filename, including extension.
    pub source_filename: String,
    /// Resolved reference title or the unknown sentinel.
    pub reference: String,
    /// Category supplied for the run.
    pub category: String,
    /// Normalized date string or the unknown sentinel.
    pub date: String,
}

/// Result of a successfully stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    /// Metadata broadcast onto every stored chunk.
    pub record: DocumentRecord,
    /// Number of pages OCR returned.
    pub pages: usize,
    /// Number of rows written.
    pub chunks_inserted: usize,
    /// Number of sub-chunks discarded for exceeding the record ceiling.
    pub chunks_dropped: usize,
    /// Time spent on this document, OCR wait included.
    pub elapsed: Duration,
}

/// A document that was skipped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDocument {
    /// Source filename.
    pub filename: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Aggregate outcome of one ingestion run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// Number of PDFs discovered.
    pub total: usize,
    /// Documents stored successfully, in processing order.
    pub loaded: Vec<DocumentOutcome>,
    /// Documents skipped, in processing order.
    pub failed: Vec<FailedDocument>,
    /// Wall-clock time spent on the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Total rows written across the run.
    pub fn chunks_inserted(&self) -> usize {
        self.loaded.iter().map(|outcome| outcome.chunks_inserted).sum()
    }

    /// Total sub-chunks dropped across stored documents.
    pub fn chunks_dropped(&self) -> usize {
        self.loaded.iter().map(|outcome| outcome.chunks_dropped).sum()
    }

    /// Filenames of skipped documents.
    pub fn failed_filenames(&self) -> Vec<&str> {
        self.failed
            .iter()
            .map(|failure| failure.filename.as_str())
            .collect()
    }
}
