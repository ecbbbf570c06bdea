//! Document processing pipeline: segmentation, bounding, batch assembly, and orchestration.

pub mod batch;
pub mod bound;
pub mod segment;
mod service;
pub mod types;

pub use batch::{Batch, BatchError, BatchRow, ColumnLengths};
pub use bound::{BoundChunks, ChunkLimits, bound, decorate};
pub use segment::segment;
pub use service::{IngestionService, discover_pdfs};
pub use types::{
    Chunk, ChunkingError, DocumentOutcome, DocumentRecord, FailedDocument, IngestError, Page,
    RunSummary, SetupError,
};
