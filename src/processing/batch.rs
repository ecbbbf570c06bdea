//! Column-oriented batch for one document's chunks.
//!
//! A [`Batch`] holds seven parallel columns. Broadcast metadata is repeated per row; embeddings are
//! supplied by the caller in chunk order. Row access goes through [`Batch::rows`], which refuses to
//! yield anything unless every column has the same length.

use thiserror::Error;

use super::types::{Chunk, DocumentRecord};

/// Lengths of each column, reported when they disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLengths {
    /// `sources` column length.
    pub sources: usize,
    /// `pages` column length.
    pub pages: usize,
    /// `categories` column length.
    pub categories: usize,
    /// `embeddings` column length.
    pub embeddings: usize,
    /// `decorated_texts` column length.
    pub decorated_texts: usize,
    /// `references` column length.
    pub references: usize,
    /// `dates` column length.
    pub dates: usize,
}

impl ColumnLengths {
    fn as_array(&self) -> [usize; 7] {
        [
            self.sources,
            self.pages,
            self.categories,
            self.embeddings,
            self.decorated_texts,
            self.references,
            self.dates,
        ]
    }

    /// Whether every column has the same length.
    pub fn is_aligned(&self) -> bool {
        let lengths = self.as_array();
        lengths.iter().all(|len| *len == lengths[0])
    }
}

/// Errors raised while assembling a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Columns have different lengths; the document must not be written.
    #[error("mismatch in data lengths for {document}: {lengths:?}")]
    LengthMismatch {
        /// Source filename of the affected document.
        document: String,
        /// Observed column lengths.
        lengths: ColumnLengths,
    },
}

/// Seven parallel columns describing one document's chunks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Source filename per row.
    pub sources: Vec<String>,
    /// Page number per row.
    pub pages: Vec<u32>,
    /// Category per row.
    pub categories: Vec<String>,
    /// Embedding vector per row.
    pub embeddings: Vec<Vec<f32>>,
    /// Decorated text per row.
    pub decorated_texts: Vec<String>,
    /// Reference per row.
    pub references: Vec<String>,
    /// Date per row.
    pub dates: Vec<String>,
}

/// Borrowed view of one row of a validated batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchRow<'a> {
    /// Source filename.
    pub source: &'a str,
    /// Page number.
    pub page: u32,
    /// Category.
    pub category: &'a str,
    /// Embedding vector.
    pub embedding: &'a [f32],
    /// Decorated text.
    pub decorated_text: &'a str,
    /// Reference.
    pub reference: &'a str,
    /// Date.
    pub date: &'a str,
}

impl Batch {
    /// Build the columns for `chunks`, broadcasting `record` onto every row.
    ///
    /// `embeddings[i]` must belong to `chunks[i]`; a count mismatch is reported, never truncated.
    pub fn assemble(
        record: &DocumentRecord,
        chunks: &[Chunk],
        embeddings: Vec<Vec<f32>>,
    ) -> Result<Self, BatchError> {
        let rows = chunks.len();
        let batch = Self {
            sources: vec![record.source_filename.clone(); rows],
            pages: chunks.iter().map(|chunk| chunk.page_number).collect(),
            categories: vec![record.category.clone(); rows],
            embeddings,
            decorated_texts: chunks
                .iter()
                .map(|chunk| chunk.decorated_text.clone())
                .collect(),
            references: vec![record.reference.clone(); rows],
            dates: vec![record.date.clone(); rows],
        };
        batch.validate()?;
        Ok(batch)
    }

    /// Current column lengths.
    pub fn lengths(&self) -> ColumnLengths {
        ColumnLengths {
            sources: self.sources.len(),
            pages: self.pages.len(),
            categories: self.categories.len(),
            embeddings: self.embeddings.len(),
            decorated_texts: self.decorated_texts.len(),
            references: self.references.len(),
            dates: self.dates.len(),
        }
    }

    /// Number of rows; only meaningful once [`Batch::validate`] passes.
    pub fn len(&self) -> usize {
        self.decorated_texts.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that all seven columns have the same length.
    pub fn validate(&self) -> Result<(), BatchError> {
        let lengths = self.lengths();
        if lengths.is_aligned() {
            Ok(())
        } else {
            Err(BatchError::LengthMismatch {
                document: self
                    .sources
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "<unknown document>".to_string()),
                lengths,
            })
        }
    }

    /// Iterate rows after re-validating column alignment.
    pub fn rows(&self) -> Result<Vec<BatchRow<'_>>, BatchError> {
        self.validate()?;
        Ok((0..self.len())
            .map(|index| BatchRow {
                source: &self.sources[index],
                page: self.pages[index],
                category: &self.categories[index],
                embedding: &self.embeddings[index],
                decorated_text: &self.decorated_texts[index],
                reference: &self.references[index],
                date: &self.dates[index],
            })
            .collect())
    }
}
