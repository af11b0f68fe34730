//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the songbook search service: document
//! registry, cache behavior, search limits, formatting budgets and the
//! locale folding table, loaded from TOML with environment overrides.
//!
//! ## Input/Output Specification
//! - **Input**: Configuration files (TOML), environment variables
//! - **Output**: Validated configuration structs with defaults and overrides
//! - **Validation**: Type checking, range validation, duplicate detection
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables
//! 2. Configuration file
//! 3. Default values

use crate::errors::{Result, SongbookError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Main configuration structure containing all system settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server and API configuration
    pub server: ServerConfig,
    /// Source document registry and fetch settings
    pub documents: DocumentsConfig,
    /// Entity cache behavior
    pub cache: CacheConfig,
    /// Query engine limits
    pub search: SearchConfig,
    /// Text normalization settings
    pub normalize: NormalizeConfig,
    /// Entity parser settings
    pub parser: ParserConfig,
    /// Response formatting settings
    pub format: FormatConfig,
    /// Canned replies consulted before search
    pub replies: Vec<CannedReply>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server and API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

/// Source document registry and fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentsConfig {
    /// Registered source documents
    pub entries: Vec<DocumentEntry>,
    /// Upstream fetch timeout in seconds
    pub fetch_timeout_seconds: u64,
}

/// One registered source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEntry {
    /// Opaque document identity used in queries and cache keys
    pub id: String,
    /// URL the block export is fetched from
    pub url: String,
    /// How the document's blocks are parsed
    pub kind: DocumentKind,
    /// Public link appended to the final body part ("open full source")
    pub source_url: Option<String>,
}

/// Parsing strategy for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    /// Row-tables with fixed song field rows
    SongTable,
    /// Free text with marker-prefixed titles
    SongMarker,
    /// Row-tables with fixed strumming pattern rows
    StrummingTable,
    /// Blank-line separated joke paragraphs
    Jokes,
}

/// Entity cache behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshot time-to-live in seconds
    pub ttl_seconds: u64,
}

/// Query engine limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum matches rendered inline before asking for refinement
    pub max_inline_results: usize,
    /// Minimum query length in characters
    pub min_query_length: usize,
}

/// Text normalization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Locale folding pairs: each `from` glyph is replaced by `to`
    pub fold: Vec<FoldPair>,
}

/// One locale folding rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FoldPair {
    pub from: char,
    pub to: char,
}

/// Entity parser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Reserved glyph prefixing a title line in marker documents
    pub marker_glyph: String,
    /// Prefix keywords classifying a metadata line as an author line
    pub author_prefixes: Vec<String>,
    /// Regex a whitespace-separated token must match to count as a chord
    pub chord_token_pattern: String,
    /// Titles at or below this length are discarded as parsing noise
    pub min_title_chars: usize,
    /// Sentinel stored when a song's authors row is empty
    pub authors_unknown: String,
}

/// Response formatting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    /// Maximum characters per message part
    pub part_char_budget: usize,
    /// Label prefixing the authors header line
    pub authors_label: String,
    /// Label prefixing the rhythm header line
    pub rhythm_label: String,
    /// Label prefixing the group header line
    pub group_label: String,
    /// Label prefixing the features header line
    pub features_label: String,
    /// Text of the "open full source" link appended to the last body part
    pub source_link_text: String,
    /// Reply when a query matches nothing
    pub nothing_found_text: String,
    /// Reply when a query matches more entities than fit inline
    pub refine_text: String,
    /// Generic reply when the songbook cannot be served at all
    pub failure_text: String,
}

/// A canned reply: normalized exact-phrase trigger and its response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CannedReply {
    pub trigger: String,
    pub reply: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable structured JSON logging
    pub json_format: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            fetch_timeout_seconds: 30,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 600 }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_inline_results: 5,
            min_query_length: 2,
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            fold: vec![FoldPair { from: 'ё', to: 'е' }],
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            marker_glyph: "♭".to_string(),
            author_prefixes: vec!["автор".to_string(), "author".to_string()],
            chord_token_pattern: r"[A-H][#b]?(?:m|maj|min|dim|aug|sus|add)?\d*(?:/[A-H][#b]?)?"
                .to_string(),
            min_title_chars: 3,
            authors_unknown: "authors unknown".to_string(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            part_char_budget: 4096,
            authors_label: "Authors:".to_string(),
            rhythm_label: "Rhythm:".to_string(),
            group_label: "Group:".to_string(),
            features_label: "Features:".to_string(),
            source_link_text: "Open the full songbook".to_string(),
            nothing_found_text: "Nothing found. Try a shorter fragment of the title or lyrics."
                .to_string(),
            refine_text: "Too many matches, please refine the query:".to_string(),
            failure_text: "The songbook is unavailable right now, please try again later."
                .to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| SongbookError::Config {
                message: format!("failed to read config file {:?}: {}", path, e),
            })?;
            toml::from_str(&content).map_err(|e| SongbookError::Config {
                message: format!("failed to parse config file {:?}: {}", path, e),
            })?
        } else {
            tracing::warn!("configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(host) = std::env::var("SONGBOOK_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("SONGBOOK_PORT") {
            self.server.port = port.parse().map_err(|_| SongbookError::Config {
                message: "invalid port number in SONGBOOK_PORT".to_string(),
            })?;
        }
        if let Ok(level) = std::env::var("SONGBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(SongbookError::Config {
                message: "server.port cannot be zero".to_string(),
            });
        }

        if self.cache.ttl_seconds == 0 {
            return Err(SongbookError::Config {
                message: "cache.ttl_seconds must be greater than zero".to_string(),
            });
        }

        // The last body part must fit the source link alongside at least one line
        if self.format.part_char_budget <= self.format.source_link_text.chars().count() + 2 {
            return Err(SongbookError::Config {
                message: "format.part_char_budget is too small for the source link".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.documents.entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(SongbookError::Config {
                    message: format!("duplicate document id '{}'", entry.id),
                });
            }
        }

        if self.parser.marker_glyph.is_empty() {
            return Err(SongbookError::Config {
                message: "parser.marker_glyph cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_inline_results, 5);
        assert_eq!(config.normalize.fold[0].from, 'ё');
    }

    #[test]
    fn loads_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
port = 9090

[cache]
ttl_seconds = 120

[[documents.entries]]
id = "songs"
url = "http://localhost/songs.json"
kind = "song-table"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.cache.ttl_seconds, 120);
        assert_eq!(config.documents.entries.len(), 1);
        assert_eq!(config.documents.entries[0].kind, DocumentKind::SongTable);
    }

    #[test]
    fn rejects_duplicate_document_ids() {
        let mut config = Config::default();
        let entry = DocumentEntry {
            id: "songs".to_string(),
            url: "http://localhost/a".to_string(),
            kind: DocumentKind::SongTable,
            source_url: None,
        };
        config.documents.entries = vec![entry.clone(), entry];
        assert!(config.validate().is_err());
    }
}
