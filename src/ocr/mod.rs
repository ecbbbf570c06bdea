//! OCR collaborator: turns raw PDF bytes into ordered page markdown.
//!
//! The Mistral client posts the document inline as a base64 `data:` URL and maps the returned
//! pages to 1-indexed [`Page`] values. Call spacing is handled separately by [`Throttle`].

mod throttle;

pub use throttle::{FixedIntervalThrottle, NoThrottle, Throttle};

use crate::config::Config;
use crate::processing::types::Page;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by OCR providers.
#[derive(Debug, Error)]
pub enum OcrError {
    /// No API key was configured for the provider.
    #[error("MISTRAL_OCR_KEY is not configured")]
    MissingApiKey,
    /// HTTP layer failed before receiving a response.
    #[error("OCR request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Provider responded with a non-success status.
    #[error("Unexpected OCR response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Response body, for diagnostics.
        body: String,
    },
    /// Provider response could not be decoded.
    #[error("Malformed OCR response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by OCR backends.
#[async_trait]
pub trait OcrClient: Send + Sync {
    /// Recognize every page of a PDF, in physical page order.
    async fn extract_pages(&self, document: &[u8]) -> Result<Vec<Page>, OcrError>;
}

/// Client for the Mistral OCR endpoint.
pub struct MistralOcrClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl MistralOcrClient {
    /// Build a client for an explicit endpoint.
    pub fn new(endpoint: String, api_key: String, model: String) -> Result<Self, OcrError> {
        if api_key.trim().is_empty() {
            return Err(OcrError::MissingApiKey);
        }
        let http = Client::builder().user_agent("docloader/ocr").build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
            model,
        })
    }

    /// Build a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, OcrError> {
        let api_key = config
            .mistral_ocr_key
            .clone()
            .ok_or(OcrError::MissingApiKey)?;
        tracing::debug!(
            endpoint = %config.mistral_ocr_url,
            model = %config.mistral_ocr_model,
            "Initialized OCR client"
        );
        Self::new(
            config.mistral_ocr_url.clone(),
            api_key,
            config.mistral_ocr_model.clone(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    #[serde(default)]
    index: Option<u32>,
    #[serde(default)]
    markdown: String,
}

#[async_trait]
impl OcrClient for MistralOcrClient {
    async fn extract_pages(&self, document: &[u8]) -> Result<Vec<Page>, OcrError> {
        let encoded = STANDARD.encode(document);
        let payload = json!({
            "model": self.model,
            "document": {
                "type": "document_url",
                "document_url": format!("data:application/pdf;base64,{encoded}"),
            },
            "include_image_base64": false,
        });

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::UnexpectedStatus { status, body });
        }

        let body: OcrResponse = response.json().await.map_err(|error| {
            OcrError::InvalidResponse(format!("failed to decode OCR response: {error}"))
        })?;

        Ok(number_pages(body.pages))
    }
}

/// Order pages by the provider's index (falling back to arrival order) and number them from 1.
fn number_pages(mut pages: Vec<OcrPage>) -> Vec<Page> {
    if pages.iter().all(|page| page.index.is_some()) {
        pages.sort_by_key(|page| page.index);
    }
    pages
        .into_iter()
        .enumerate()
        .map(|(position, page)| Page {
            page_number: position as u32 + 1,
            raw_text: page.markdown,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(server: &MockServer) -> MistralOcrClient {
        MistralOcrClient::new(
            format!("{}/v1/ocr", server.base_url()),
            "secret".into(),
            "mistral-ocr-latest".into(),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn extract_pages_sends_inline_document_and_numbers_pages() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/ocr")
                    .header("authorization", "Bearer secret")
                    .json_body(json!({
                        "model": "mistral-ocr-latest",
                        "document": {
                            "type": "document_url",
                            "document_url": "data:application/pdf;base64,JVBERi0=",
                        },
                        "include_image_base64": false,
                    }));
                then.status(200).json_body(json!({
                    "pages": [
                        { "index": 1, "markdown": "second" },
                        { "index": 0, "markdown": "# first" }
                    ],
                    "model": "mistral-ocr-latest"
                }));
            })
            .await;

        let pages = client(&server)
            .extract_pages(b"%PDF-")
            .await
            .expect("pages");

        mock.assert();
        assert_eq!(
            pages,
            vec![
                Page {
                    page_number: 1,
                    raw_text: "# first".into()
                },
                Page {
                    page_number: 2,
                    raw_text: "second".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/ocr");
                then.status(429).body("rate limited");
            })
            .await;

        let error = client(&server).extract_pages(b"pdf").await.unwrap_err();
        assert!(matches!(
            error,
            OcrError::UnexpectedStatus { status, ref body }
                if status == StatusCode::TOO_MANY_REQUESTS && body == "rate limited"
        ));
    }

    #[tokio::test]
    async fn empty_page_list_is_not_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/ocr");
                then.status(200).json_body(json!({ "pages": [] }));
            })
            .await;

        let pages = client(&server).extract_pages(b"pdf").await.expect("pages");
        assert!(pages.is_empty());
    }

    #[test]
    fn blank_api_key_is_rejected() {
        assert!(matches!(
            MistralOcrClient::new("http://localhost".into(), "  ".into(), "m".into()),
            Err(OcrError::MissingApiKey)
        ));
    }
}
