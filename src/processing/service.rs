//! Ingestion service: PDF bytes in, stored passages out, one document at a time.

use crate::{
    config::Config,
    dates::DatePolicy,
    embedding::{EmbeddingClient, EmbeddingClientError, get_embedding_client},
    metrics::{IngestMetrics, MetricsSnapshot},
    ocr::{FixedIntervalThrottle, MistralOcrClient, NoThrottle, OcrClient, Throttle},
    processing::{
        batch::Batch,
        bound::{ChunkLimits, bound},
        segment::segment,
        types::{
            Chunk, DocumentOutcome, DocumentRecord, FailedDocument, IngestError, Page, RunSummary,
            SetupError,
        },
    },
    qdrant::{QdrantGateway, StorageGateway},
    reference::ReferenceResolver,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

/// Drives OCR, segmentation, bounding, embedding, and storage for each input document.
///
/// Documents are handled strictly in sequence. Any failure inside one document is reported in the
/// [`RunSummary`] and the run moves on; only [`SetupError`]s stop it.
pub struct IngestionService {
    ocr: Box<dyn OcrClient>,
    embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
    storage: Box<dyn StorageGateway>,
    throttle: Box<dyn Throttle>,
    resolver: ReferenceResolver,
    dates: DatePolicy,
    limits: ChunkLimits,
    embedding_dimension: Option<usize>,
    metrics: Arc<IngestMetrics>,
}

impl IngestionService {
    /// Assemble a service from its collaborators with default policies and no throttling.
    pub fn new(
        ocr: Box<dyn OcrClient>,
        embedding_client: Box<dyn EmbeddingClient + Send + Sync>,
        storage: Box<dyn StorageGateway>,
    ) -> Self {
        Self {
            ocr,
            embedding_client,
            storage,
            throttle: Box::new(NoThrottle),
            resolver: ReferenceResolver::default(),
            dates: DatePolicy::default(),
            limits: ChunkLimits::default(),
            embedding_dimension: None,
            metrics: Arc::new(IngestMetrics::new()),
        }
    }

    /// Build the production service and make sure the collection exists.
    pub async fn from_config(config: &Config) -> Result<Self, SetupError> {
        tracing::info!("Initializing OCR client");
        let ocr = MistralOcrClient::from_config(config)?;
        tracing::info!("Initializing embedding client");
        let embedding_client = get_embedding_client(config)?;
        let storage = QdrantGateway::from_config(config)?;
        tracing::debug!(
            collection = %storage.collection(),
            vector_size = config.embedding_dimension,
            "Ensuring primary collection"
        );
        storage.ensure_schema().await?;

        let resolver = match &config.reference_map_path {
            Some(path) => {
                let resolver = ReferenceResolver::from_json_file(path)?;
                tracing::info!(
                    path = %path.display(),
                    entries = resolver.len(),
                    "Loaded reference map"
                );
                resolver
            }
            None => {
                tracing::warn!(
                    "No reference map configured; every document will use the unknown reference"
                );
                ReferenceResolver::default()
            }
        };

        Ok(Self::new(Box::new(ocr), embedding_client, Box::new(storage))
            .with_throttle(Box::new(FixedIntervalThrottle::new(config.ocr_cooldown)))
            .with_resolver(resolver)
            .with_dates(DatePolicy {
                fixed: config.document_date.clone(),
                normalization: config.date_normalization,
            })
            .with_limits(ChunkLimits {
                max_record_length: config.max_record_length,
                split_size: config.split_chunk_size,
                split_overlap: config.split_chunk_overlap,
            })
            .with_embedding_dimension(config.embedding_dimension))
    }

    /// Space OCR calls with `throttle`.
    pub fn with_throttle(mut self, throttle: Box<dyn Throttle>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Resolve references through `resolver`.
    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Derive dates with `dates`.
    pub fn with_dates(mut self, dates: DatePolicy) -> Self {
        self.dates = dates;
        self
    }

    /// Bound chunks with `limits`.
    pub fn with_limits(mut self, limits: ChunkLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Reject embeddings whose length differs from `dimension`.
    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = Some(dimension);
        self
    }

    /// Counters accumulated since the service was built.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Ingest every `*.pdf` directly inside `input_dir`, in filename order.
    pub async fn run(&self, input_dir: &Path, category: &str) -> Result<RunSummary, SetupError> {
        let started = Instant::now();
        let files = discover_pdfs(input_dir)?;
        tracing::info!(
            input_dir = %input_dir.display(),
            category,
            documents = files.len(),
            "Starting ingestion run"
        );

        let mut summary = RunSummary {
            total: files.len(),
            ..RunSummary::default()
        };

        for path in files {
            let filename = file_name(&path);
            tracing::info!(file = %filename, "Loading document");
            match self.ingest_document(&path, category).await {
                Ok(outcome) => {
                    tracing::info!(
                        file = %filename,
                        reference = %outcome.record.reference,
                        date = %outcome.record.date,
                        pages = outcome.pages,
                        chunks = outcome.chunks_inserted,
                        dropped = outcome.chunks_dropped,
                        elapsed_ms = outcome.elapsed.as_millis() as u64,
                        "Document loaded"
                    );
                    summary.loaded.push(outcome);
                }
                Err(error) => {
                    self.metrics.record_failure();
                    report_failure(&filename, &error);
                    summary.failed.push(FailedDocument {
                        filename,
                        reason: error.to_string(),
                    });
                }
            }
        }

        summary.elapsed = started.elapsed();
        tracing::info!(
            total = summary.total,
            loaded = summary.loaded.len(),
            failed = summary.failed.len(),
            chunks = summary.chunks_inserted(),
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Ingestion run finished"
        );
        Ok(summary)
    }

    /// Run the whole pipeline for one PDF. Nothing is written unless every step succeeds.
    pub async fn ingest_document(
        &self,
        path: &Path,
        category: &str,
    ) -> Result<DocumentOutcome, IngestError> {
        let started = Instant::now();
        let source_filename = file_name(path);
        let bytes = tokio::fs::read(path).await?;

        self.throttle.acquire().await;
        let pages = self.ocr.extract_pages(&bytes).await?;
        if pages.is_empty() {
            return Err(IngestError::NoPages);
        }
        tracing::debug!(file = %source_filename, pages = pages.len(), "OCR complete");

        let reference = self.resolver.resolve(&source_filename);
        let (chunks, chunks_dropped) = self.chunk_pages(&pages, &reference)?;
        if chunks.is_empty() {
            return Err(IngestError::EmptyContent);
        }

        let record = DocumentRecord {
            source_filename,
            date: self.dates.resolve(&reference),
            reference,
            category: category.to_string(),
        };

        let embeddings = self.embed_chunks(&chunks).await?;
        let batch = Batch::assemble(&record, &chunks, embeddings)?;
        let chunks_inserted = self.storage.insert(&batch).await?;

        self.metrics
            .record_document(chunks_inserted as u64, chunks_dropped as u64);

        Ok(DocumentOutcome {
            record,
            pages: pages.len(),
            chunks_inserted,
            chunks_dropped,
            elapsed: started.elapsed(),
        })
    }

    fn chunk_pages(
        &self,
        pages: &[Page],
        reference: &str,
    ) -> Result<(Vec<Chunk>, usize), IngestError> {
        let mut chunks = Vec::new();
        let mut dropped = 0;
        for page in pages {
            for section in segment(&page.raw_text) {
                let bounded = bound(&section, page.page_number, reference, &self.limits)?;
                dropped += bounded.dropped;
                chunks.extend(bounded.chunks);
            }
        }
        Ok((chunks, dropped))
    }

    /// One provider call per chunk, in chunk order.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, IngestError> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vectors = self
                .embedding_client
                .generate_embeddings(vec![chunk.decorated_text.clone()])
                .await?;
            if let Some(expected) = self.embedding_dimension
                && let Some(actual) = vectors
                    .iter()
                    .map(Vec::len)
                    .find(|actual| *actual != expected)
            {
                return Err(EmbeddingClientError::DimensionMismatch { expected, actual }.into());
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

fn report_failure(filename: &str, error: &IngestError) {
    match error {
        IngestError::Batch(_) => {
            tracing::error!(
                file = filename,
                error = %error,
                "Batch columns disagree; document not inserted"
            );
        }
        IngestError::Storage(storage) if storage.is_parameter_error() => {
            tracing::error!(
                file = filename,
                error = %error,
                "Storage rejected document; skipping"
            );
        }
        _ => {
            tracing::warn!(file = filename, error = %error, "Skipping document");
        }
    }
}

/// Regular `*.pdf` files directly inside `dir`, sorted by name.
pub fn discover_pdfs(dir: &Path) -> Result<Vec<PathBuf>, walkdir::Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
