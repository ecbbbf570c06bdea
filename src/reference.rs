//! Filename → human-readable reference lookup.

use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Reference assigned to any filename missing from the table.
pub const UNKNOWN_REFERENCE: &str = "Unknown Reference";

/// Errors raised while loading a reference table from disk.
#[derive(Debug, Error)]
pub enum ReferenceMapError {
    /// The table file could not be read.
    #[error("failed to read reference map {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The table file was not a JSON object of strings.
    #[error("failed to parse reference map {path}: {source}")]
    Parse {
        /// Path that failed to parse.
        path: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Resolves source filenames to document titles through an exact-match table.
///
/// Keys are compared case-sensitively and include the extension.
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    table: HashMap<String, String>,
}

impl ReferenceResolver {
    /// Build a resolver over the given table.
    pub fn new(table: HashMap<String, String>) -> Self {
        Self { table }
    }

    /// Load a resolver from a JSON object mapping filenames to references.
    pub fn from_json_file(path: &Path) -> Result<Self, ReferenceMapError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ReferenceMapError::Io {
            path: display.clone(),
            source,
        })?;
        let table: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| ReferenceMapError::Parse {
                path: display,
                source,
            })?;
        tracing::debug!(entries = table.len(), path = %path.display(), "Loaded reference map");
        Ok(Self::new(table))
    }

    /// Return the reference for `filename`, or [`UNKNOWN_REFERENCE`] when unmapped.
    pub fn resolve(&self, filename: &str) -> String {
        self.table
            .get(filename)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_REFERENCE.to_string())
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
