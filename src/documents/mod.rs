//! # Document Reader Module
//!
//! ## Purpose
//! Abstracts access to a rich-text document's ordered content blocks,
//! independent of the underlying storage API. Any transport that can
//! produce an ordered block list can implement the source trait.
//!
//! ## Input/Output Specification
//! - **Input**: Opaque document identity
//! - **Output**: Ordered `RawBlock` sequence, produced fresh per fetch
//! - **Failure modes**: `FetchFailed` (network/auth), `EmptyDocument`
//!
//! ## Architecture
//! - `DocumentSource` trait: common interface for all providers
//! - `http.rs`: JSON block export fetched over HTTP
//! - `StaticSource`: in-memory provider for tests and demos

pub mod http;

pub use http::HttpDocumentSource;

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One structural unit of a source document. Read-only; a fresh sequence is
/// produced on every fetch and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RawBlock {
    /// A table whose rows carry fixed positional meaning
    Table { rows: Vec<String> },
    /// A free-text paragraph run
    Paragraph { text: String },
}

/// Trait for document block providers
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Get the name of this source for logging
    fn name(&self) -> &str;

    /// Fetch the ordered block sequence for a document identity
    async fn fetch_blocks(&self, document_id: &str) -> Result<Vec<RawBlock>>;
}

/// In-memory document source serving fixed block lists. Used by tests and
/// by deployments that load exported documents from disk at startup.
#[derive(Debug, Default)]
pub struct StaticSource {
    documents: HashMap<String, Vec<RawBlock>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document's block sequence
    pub fn insert(&mut self, document_id: impl Into<String>, blocks: Vec<RawBlock>) {
        self.documents.insert(document_id.into(), blocks);
    }
}

#[async_trait]
impl DocumentSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_blocks(&self, document_id: &str) -> Result<Vec<RawBlock>> {
        let blocks = self.documents.get(document_id).cloned().ok_or_else(|| {
            crate::errors::SongbookError::FetchFailed {
                document: document_id.to_string(),
                details: "unknown document".to_string(),
            }
        })?;

        if blocks.is_empty() {
            return Err(crate::errors::SongbookError::EmptyDocument {
                document: document_id.to_string(),
            });
        }

        Ok(blocks)
    }
}
