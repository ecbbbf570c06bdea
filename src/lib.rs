#![deny(missing_docs)]

//! Core library for docloader: PDF reports to searchable passages in Qdrant.

/// Environment-driven configuration management.
pub mod config;
/// Date extraction and normalization for document references.
pub mod dates;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion metrics helpers.
pub mod metrics;
/// OCR client and call throttling.
pub mod ocr;
/// Document processing pipeline utilities.
pub mod processing;
/// Qdrant vector store integration.
pub mod qdrant;
/// Filename to reference title lookup.
pub mod reference;
