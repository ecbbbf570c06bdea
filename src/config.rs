use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MISTRAL_OCR_URL: &str = "https://api.mistral.ai/v1/ocr";
const DEFAULT_MISTRAL_OCR_MODEL: &str = "mistral-ocr-latest";
const DEFAULT_OCR_COOLDOWN_MS: u64 = 1000;

/// Ceiling on the decorated text stored per record.
pub const DEFAULT_MAX_RECORD_LENGTH: usize = 8192;
/// Target sub-chunk size used when a segment has to be re-split.
pub const DEFAULT_SPLIT_CHUNK_SIZE: usize = 2000;
/// Overlap carried between consecutive sub-chunks.
pub const DEFAULT_SPLIT_CHUNK_OVERLAP: usize = 200;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for a docloader run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the Qdrant instance that stores passages.
    pub qdrant_url: String,
    /// Name of the Qdrant collection receiving the passages.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// API key for OpenAI-compatible embedding endpoints.
    pub openai_api_key: Option<String>,
    /// Base URL for OpenAI-compatible embedding endpoints.
    pub openai_base_url: String,
    /// API key for the Mistral OCR endpoint.
    pub mistral_ocr_key: Option<String>,
    /// Full URL of the OCR endpoint.
    pub mistral_ocr_url: String,
    /// OCR model identifier.
    pub mistral_ocr_model: String,
    /// Minimum spacing between consecutive OCR calls.
    pub ocr_cooldown: Duration,
    /// Directory scanned for `*.pdf` inputs.
    pub input_dir: Option<PathBuf>,
    /// Category stamped onto every passage of the run.
    pub category: Option<String>,
    /// Optional JSON file mapping filenames to references.
    pub reference_map_path: Option<PathBuf>,
    /// Raw date used for every document instead of extracting one from the reference.
    pub document_date: Option<String>,
    /// Normalization applied to the extracted date.
    pub date_normalization: DateNormalization,
    /// Maximum length of a decorated record.
    pub max_record_length: usize,
    /// Sub-chunk size used when re-splitting oversize segments.
    pub split_chunk_size: usize,
    /// Overlap between re-split sub-chunks.
    pub split_chunk_overlap: usize,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
    /// Deterministic in-process hashing; intended for dry runs and tests.
    Hash,
}

/// How the date attached to a document is normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateNormalization {
    /// Keep the extractor output as-is (ranges stay ranges).
    #[default]
    Extract,
    /// Run the extractor output through `normalize_to_month_year`.
    MonthYear,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            qdrant_url: load_env("QDRANT_URL")?,
            qdrant_collection_name: load_env("QDRANT_COLLECTION_NAME")?,
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env("EMBEDDING_PROVIDER")?
                .parse()
                .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))?,
            embedding_model: load_env("EMBEDDING_MODEL")?,
            embedding_dimension: parse_required("EMBEDDING_DIMENSION")?,
            ollama_url: load_env_optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            mistral_ocr_key: load_env_optional("MISTRAL_OCR_KEY"),
            mistral_ocr_url: load_env_optional("MISTRAL_OCR_URL")
                .unwrap_or_else(|| DEFAULT_MISTRAL_OCR_URL.to_string()),
            mistral_ocr_model: load_env_optional("MISTRAL_OCR_MODEL")
                .unwrap_or_else(|| DEFAULT_MISTRAL_OCR_MODEL.to_string()),
            ocr_cooldown: Duration::from_millis(
                parse_optional("OCR_COOLDOWN_MS")?.unwrap_or(DEFAULT_OCR_COOLDOWN_MS),
            ),
            input_dir: load_env_optional("INGEST_INPUT_DIR").map(PathBuf::from),
            category: load_env_optional("INGEST_CATEGORY"),
            reference_map_path: load_env_optional("REFERENCE_MAP_PATH").map(PathBuf::from),
            document_date: load_env_optional("DOCUMENT_DATE"),
            date_normalization: load_env_optional("DATE_NORMALIZATION")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("DATE_NORMALIZATION".into()))
                })
                .transpose()?
                .unwrap_or_default(),
            max_record_length: parse_optional("MAX_RECORD_LENGTH")?
                .unwrap_or(DEFAULT_MAX_RECORD_LENGTH),
            split_chunk_size: parse_optional("SPLIT_CHUNK_SIZE")?
                .unwrap_or(DEFAULT_SPLIT_CHUNK_SIZE),
            split_chunk_overlap: parse_optional("SPLIT_CHUNK_OVERLAP")?
                .unwrap_or(DEFAULT_SPLIT_CHUNK_OVERLAP),
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_required<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    load_env(key)?
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_optional<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

impl FromStr for DateNormalization {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "extract" => Ok(Self::Extract),
            "month-year" | "month_year" => Ok(Self::MonthYear),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
///
/// A `.env` file in the working directory is honored when present.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        qdrant_url = %config.qdrant_url,
        collection = %config.qdrant_collection_name,
        embedding_provider = ?config.embedding_provider,
        embedding_dimension = config.embedding_dimension,
        max_record_length = config.max_record_length,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_provider_parses_case_insensitively() {
        assert_eq!("Ollama".parse(), Ok(EmbeddingProvider::Ollama));
        assert_eq!("OPENAI".parse(), Ok(EmbeddingProvider::OpenAI));
        assert_eq!(" hash ".parse(), Ok(EmbeddingProvider::Hash));
        assert!("sentence-transformers".parse::<EmbeddingProvider>().is_err());
    }

    #[test]
    fn date_normalization_accepts_both_spellings() {
        assert_eq!("extract".parse(), Ok(DateNormalization::Extract));
        assert_eq!("month-year".parse(), Ok(DateNormalization::MonthYear));
        assert_eq!("MONTH_YEAR".parse(), Ok(DateNormalization::MonthYear));
        assert!("range".parse::<DateNormalization>().is_err());
        assert_eq!(DateNormalization::default(), DateNormalization::Extract);
    }
}
