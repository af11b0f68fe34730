//! # HTTP Document Source
//!
//! ## Purpose
//! Fetches a document's JSON block export over HTTP. This is the concrete
//! reader for deployments where the rich-text backend exposes (or a sidecar
//! produces) an ordered block list per document.
//!
//! ## Input/Output Specification
//! - **Input**: Document identity mapped to an export URL
//! - **Output**: Ordered `RawBlock` sequence parsed from the JSON body
//! - **Failure modes**: network error or non-2xx → `FetchFailed`,
//!   zero blocks → `EmptyDocument`

use crate::config::DocumentsConfig;
use crate::documents::{DocumentSource, RawBlock};
use crate::errors::{Result, SongbookError};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Document source backed by an HTTP block export
pub struct HttpDocumentSource {
    client: Client,
    urls: HashMap<String, String>,
}

impl HttpDocumentSource {
    /// Build a source from the document registry. The client carries the
    /// configured upstream timeout; a hung fetch surfaces as `FetchFailed`.
    pub fn new(config: &DocumentsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.fetch_timeout_seconds))
            .user_agent("songbook-search/0.1")
            .build()
            .map_err(|e| SongbookError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let urls = config
            .entries
            .iter()
            .map(|entry| (entry.id.clone(), entry.url.clone()))
            .collect();

        Ok(Self { client, urls })
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_blocks(&self, document_id: &str) -> Result<Vec<RawBlock>> {
        let url = self.urls.get(document_id).ok_or_else(|| {
            SongbookError::Config {
                message: format!("document '{}' has no registered URL", document_id),
            }
        })?;

        debug!(document = document_id, url = url.as_str(), "fetching document blocks");

        let response = self.client.get(url).send().await.map_err(|e| {
            SongbookError::FetchFailed {
                document: document_id.to_string(),
                details: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            return Err(SongbookError::FetchFailed {
                document: document_id.to_string(),
                details: format!("HTTP {}", response.status()),
            });
        }

        let blocks: Vec<RawBlock> =
            response.json().await.map_err(|e| SongbookError::FetchFailed {
                document: document_id.to_string(),
                details: format!("invalid block export: {}", e),
            })?;

        if blocks.is_empty() {
            return Err(SongbookError::EmptyDocument {
                document: document_id.to_string(),
            });
        }

        debug!(document = document_id, blocks = blocks.len(), "fetched document");
        Ok(blocks)
    }
}
