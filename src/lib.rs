//! # Songbook Search Service
//!
//! ## Overview
//! This library implements the document-to-entity parsing and fuzzy search
//! engine behind a songbook chat assistant: semi-structured rich-text
//! documents become typed records (songs, strumming patterns, jokes), and
//! free-text queries are answered against them with locale-aware
//! normalization and deterministic disambiguation.
//!
//! ## Architecture
//! The system is composed of several key modules:
//! - `documents`: Block-level access to source documents (HTTP or static)
//! - `parser`: Positional and marker-based entity extraction
//! - `normalize`: Locale-aware text canonicalization
//! - `search`: Mode-scoped substring query engine
//! - `cache`: TTL snapshot cache with stale-serve and refresh coalescing
//! - `format`: Ordered multi-part message rendering
//! - `api`: REST boundary standing in for the chat transport
//! - `config`: Configuration management and settings
//! - `errors`: Centralized error handling and types
//!
//! ## Input/Output Specification
//! - **Input**: Rich-text document block exports, free-text queries
//! - **Output**: Ordered message parts (text and media references)
//!
//! ## Usage
//! ```rust,no_run
//! use songbook_search::{cache::EntityCache, search::{QueryEngine, SearchMode}};
//! # async fn run(cache: EntityCache, engine: QueryEngine) -> songbook_search::errors::Result<()> {
//! let entities = cache.entities("songs").await?;
//! let hits = engine.search(&entities, "gray bird", SearchMode::Title);
//! println!("found {} matches", hits.len());
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod api;
pub mod cache;
pub mod config;
pub mod documents;
pub mod errors;
pub mod format;
pub mod normalize;
pub mod parser;
pub mod search;

// Utilities
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use errors::{Result, SongbookError};
pub use search::{QueryEngine, SearchHit, SearchMode};

use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

/// Opaque document identity (an ID or URL supplied by configuration)
pub type DocumentId = String;

/// Opaque handle to a media object held by the transport (file ID, URL)
pub type MediaHandle = String;

/// A parsed song record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Song title
    pub title: String,
    /// Authors line; the configured sentinel when the source had none
    pub authors: String,
    /// Rhythm notation; may be empty for marker-parsed songs
    pub rhythm: String,
    /// Group or ensemble
    pub group: Option<String>,
    /// Feature notes; omitted from rendering when absent
    pub features: Option<String>,
    /// Performance voice recording
    pub voice: Option<MediaHandle>,
    /// Transport-native video
    pub video: Option<MediaHandle>,
    /// External video URL
    pub video_url: Option<String>,
    /// Combined lyric and chord body
    pub body: String,
    /// 0-based index of first appearance in the source document.
    /// Stable identity within one document snapshot.
    pub position: usize,
}

/// A parsed strumming pattern record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrummingPattern {
    /// Pattern title
    pub title: String,
    /// Feature notes
    pub features: Option<String>,
    /// Illustrative photo
    pub photo: Option<MediaHandle>,
    /// Voice demonstration
    pub voice: Option<MediaHandle>,
    /// Video demonstration
    pub video: Option<MediaHandle>,
    /// 0-based index of first appearance in the source document
    pub position: usize,
}

/// A parsed joke: one free-text paragraph run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Joke {
    /// Joke text
    pub text: String,
    /// 0-based index of first appearance in the source document
    pub position: usize,
}

/// A parsed entity of any kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Entity {
    Song(Song),
    Strumming(StrummingPattern),
    Joke(Joke),
}

impl Entity {
    /// Source position: the entity's identity within one document snapshot
    pub fn position(&self) -> usize {
        match self {
            Entity::Song(s) => s.position,
            Entity::Strumming(p) => p.position,
            Entity::Joke(j) => j.position,
        }
    }

    /// Title, for entities that have one
    pub fn title(&self) -> Option<&str> {
        match self {
            Entity::Song(s) => Some(&s.title),
            Entity::Strumming(p) => Some(&p.title),
            Entity::Joke(_) => None,
        }
    }

    /// Searchable free-text body
    pub fn body(&self) -> Option<&str> {
        match self {
            Entity::Song(s) => Some(&s.body),
            Entity::Strumming(_) => None,
            Entity::Joke(j) => Some(&j.text),
        }
    }

    /// Authors line, for songs
    pub fn authors(&self) -> Option<&str> {
        match self {
            Entity::Song(s) => Some(&s.authors),
            _ => None,
        }
    }
}

/// Application state shared across API handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub cache: Arc<cache::EntityCache>,
    pub engine: Arc<search::QueryEngine>,
    pub formatter: Arc<format::ResponseFormatter>,
    /// Round-robin cursor for joke delivery
    pub joke_cursor: Arc<AtomicUsize>,
}
