//! # Cache Manager Module
//!
//! ## Purpose
//! Holds the most recently parsed entity set per document with a TTL,
//! refreshing through the document reader and entity parser and serving
//! stale data when a refresh fails.
//!
//! ## Input/Output Specification
//! - **Input**: Document identity
//! - **Output**: Immutable entity snapshot (`Arc<[Entity]>`)
//! - **Policy**: fresh snapshot served without refetch; refresh failure
//!   downgrades to stale-serve when a prior snapshot exists
//!
//! ## Key Features
//! - Wholesale snapshot replacement: readers see old or new, never a mix
//! - Per-document refresh coalescing: overlapping expirations await one
//!   in-flight upstream fetch
//! - `EmptyDocument` cached as a valid empty snapshot
//! - Explicit lifecycle: `invalidate`, `refresh`, `stats`

use crate::config::{CacheConfig, DocumentEntry, DocumentKind};
use crate::documents::DocumentSource;
use crate::errors::{Result, SongbookError};
use crate::parser::EntityParser;
use crate::{DocumentId, Entity};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// One successful parse of a document, immutable once stored
#[derive(Clone)]
pub struct Snapshot {
    pub entities: Arc<[Entity]>,
    pub fetched_at: DateTime<Utc>,
}

/// Per-document cache cell. The snapshot swap is the only shared-state
/// mutation in the pipeline; the async mutex coalesces refreshes.
struct DocEntry {
    kind: DocumentKind,
    snapshot: parking_lot::RwLock<Option<Snapshot>>,
    refresh: tokio::sync::Mutex<()>,
}

impl DocEntry {
    fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            snapshot: parking_lot::RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    /// Snapshot younger than the TTL, if any
    fn fresh(&self, ttl_seconds: u64) -> Option<Snapshot> {
        let guard = self.snapshot.read();
        guard.as_ref().and_then(|snap| {
            let age = Utc::now().signed_duration_since(snap.fetched_at);
            if age.num_seconds() < ttl_seconds as i64 {
                Some(snap.clone())
            } else {
                None
            }
        })
    }

    /// Any snapshot regardless of age (the stale-serve fallback)
    fn any(&self) -> Option<Snapshot> {
        self.snapshot.read().clone()
    }

    fn store(&self, entities: Arc<[Entity]>) {
        *self.snapshot.write() = Some(Snapshot {
            entities,
            fetched_at: Utc::now(),
        });
    }
}

/// Cache statistics for the operational surface
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub documents: Vec<DocumentStats>,
}

/// Per-document cache state
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStats {
    pub document: DocumentId,
    pub entities: Option<usize>,
    pub fetched_at: Option<DateTime<Utc>>,
}

/// TTL snapshot cache over the document reader and entity parser
pub struct EntityCache {
    source: Arc<dyn DocumentSource>,
    parser: EntityParser,
    ttl_seconds: u64,
    entries: DashMap<DocumentId, Arc<DocEntry>>,
}

impl EntityCache {
    /// Create a cache for the registered documents
    pub fn new(
        source: Arc<dyn DocumentSource>,
        parser: EntityParser,
        config: &CacheConfig,
        documents: &[DocumentEntry],
    ) -> Self {
        let entries = DashMap::new();
        for entry in documents {
            entries.insert(entry.id.clone(), Arc::new(DocEntry::new(entry.kind)));
        }
        Self {
            source,
            parser,
            ttl_seconds: config.ttl_seconds,
            entries,
        }
    }

    /// Get the entity snapshot for a document, refreshing when expired.
    /// Concurrent callers during an expired window share one upstream fetch.
    pub async fn entities(&self, document_id: &str) -> Result<Arc<[Entity]>> {
        let entry = self.entry(document_id)?;

        if let Some(snapshot) = entry.fresh(self.ttl_seconds) {
            return Ok(snapshot.entities);
        }

        // Coalesce: only one caller refreshes; the rest block here and then
        // find the snapshot the winner stored.
        let _guard = entry.refresh.lock().await;
        if let Some(snapshot) = entry.fresh(self.ttl_seconds) {
            return Ok(snapshot.entities);
        }

        match self.fetch_and_parse(document_id, entry.kind).await {
            Ok(entities) => {
                entry.store(entities.clone());
                info!(document = document_id, entities = entities.len(), "snapshot refreshed");
                Ok(entities)
            }
            Err(e) => {
                if let Some(stale) = entry.any() {
                    warn!(
                        document = document_id,
                        error = %e,
                        category = e.category(),
                        "refresh failed, serving stale snapshot"
                    );
                    Ok(stale.entities)
                } else {
                    warn!(document = document_id, error = %e, "refresh failed with no snapshot");
                    Err(SongbookError::DocumentUnavailable {
                        document: document_id.to_string(),
                    })
                }
            }
        }
    }

    /// Force a refresh regardless of snapshot age
    pub async fn refresh(&self, document_id: &str) -> Result<Arc<[Entity]>> {
        let entry = self.entry(document_id)?;
        let _guard = entry.refresh.lock().await;
        let entities = self.fetch_and_parse(document_id, entry.kind).await?;
        entry.store(entities.clone());
        Ok(entities)
    }

    /// Drop a document's snapshot; the next query refetches
    pub fn invalidate(&self, document_id: &str) {
        if let Some(entry) = self.entries.get(document_id) {
            *entry.snapshot.write() = None;
        }
    }

    /// Current cache state for the operational surface
    pub fn stats(&self) -> CacheStats {
        let documents = self
            .entries
            .iter()
            .map(|item| {
                let snapshot = item.value().any();
                DocumentStats {
                    document: item.key().clone(),
                    entities: snapshot.as_ref().map(|s| s.entities.len()),
                    fetched_at: snapshot.map(|s| s.fetched_at),
                }
            })
            .collect();
        CacheStats { documents }
    }

    fn entry(&self, document_id: &str) -> Result<Arc<DocEntry>> {
        self.entries
            .get(document_id)
            .map(|e| e.value().clone())
            .ok_or_else(|| SongbookError::Config {
                message: format!("document '{}' is not registered", document_id),
            })
    }

    async fn fetch_and_parse(
        &self,
        document_id: &str,
        kind: DocumentKind,
    ) -> Result<Arc<[Entity]>> {
        let blocks = match self.source.fetch_blocks(document_id).await {
            Ok(blocks) => blocks,
            // A fetched-but-empty document is a valid empty snapshot, not a
            // failure to recover from.
            Err(SongbookError::EmptyDocument { .. }) => Vec::new(),
            Err(e) => return Err(e),
        };

        let entities = self.parser.parse(document_id, kind, &blocks);
        Ok(entities.into())
    }
}
