//! # Entity Parser Module
//!
//! ## Purpose
//! Converts raw document blocks into typed entities using the strategy the
//! document's kind selects: positional field extraction for fixed-shape
//! tables, a marker-driven state machine for free-text song documents, and
//! blank-line paragraph grouping for joke documents.
//!
//! ## Input/Output Specification
//! - **Input**: Ordered `RawBlock` sequence and the document's kind
//! - **Output**: Entities in order of first appearance, positions assigned
//! - **Isolation**: a malformed block is skipped with a warning; the rest
//!   of the document survives
//!
//! ## Architecture
//! - `table.rs`: explicit schema over fixed-row tables
//! - `marker.rs`: finite-state machine over the paragraph stream
//! - `classify.rs`: ordered declarative line classifier

pub mod classify;
pub mod marker;
pub mod table;

use crate::config::{DocumentKind, ParserConfig};
use crate::documents::RawBlock;
use crate::errors::Result;
use crate::{Entity, Joke};
use marker::MarkerParser;
use tracing::{debug, warn};

/// Strategy-dispatching entity parser
pub struct EntityParser {
    config: ParserConfig,
    marker: MarkerParser,
}

impl EntityParser {
    pub fn new(config: &ParserConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            marker: MarkerParser::new(config)?,
        })
    }

    /// Parse a document's blocks into entities. Positions are 0-based
    /// indices of first appearance and identify entities within the
    /// snapshot this parse produces.
    pub fn parse(&self, document: &str, kind: DocumentKind, blocks: &[RawBlock]) -> Vec<Entity> {
        let entities = match kind {
            DocumentKind::SongTable => self.parse_song_tables(document, blocks),
            DocumentKind::StrummingTable => self.parse_strumming_tables(document, blocks),
            DocumentKind::SongMarker => self
                .marker
                .parse_lines(paragraph_lines(document, blocks))
                .into_iter()
                .map(Entity::Song)
                .collect(),
            DocumentKind::Jokes => parse_jokes(paragraph_lines(document, blocks)),
        };

        debug!(
            document,
            kind = ?kind,
            entities = entities.len(),
            "parsed document blocks"
        );
        entities
    }

    fn parse_song_tables(&self, document: &str, blocks: &[RawBlock]) -> Vec<Entity> {
        let mut entities = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let rows = match block {
                RawBlock::Table { rows } => rows,
                RawBlock::Paragraph { .. } => continue,
            };
            match table::parse_song_table(&self.config, rows, document, index, entities.len()) {
                Ok(song) => entities.push(Entity::Song(song)),
                Err(e) => warn!(error = %e, "skipping malformed song table"),
            }
        }
        entities
    }

    fn parse_strumming_tables(&self, document: &str, blocks: &[RawBlock]) -> Vec<Entity> {
        let mut entities = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            let rows = match block {
                RawBlock::Table { rows } => rows,
                RawBlock::Paragraph { .. } => continue,
            };
            match table::parse_strumming_table(rows, document, index, entities.len()) {
                Ok(pattern) => entities.push(Entity::Strumming(pattern)),
                Err(e) => warn!(error = %e, "skipping malformed strumming table"),
            }
        }
        entities
    }
}

/// Flatten a document's paragraph blocks into a line stream. Table blocks
/// have no meaning in free-text documents and are skipped with a warning.
fn paragraph_lines<'a>(document: &str, blocks: &'a [RawBlock]) -> Vec<&'a str> {
    let mut lines = Vec::new();
    for (index, block) in blocks.iter().enumerate() {
        match block {
            RawBlock::Paragraph { text } => lines.extend(text.lines()),
            RawBlock::Table { .. } => {
                warn!(document, index, "skipping table block in free-text document");
            }
        }
    }
    lines
}

/// Group a line stream into jokes: one joke per blank-line separated run
fn parse_jokes<'a, I>(lines: I) -> Vec<Entity>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut jokes = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let finalize = |current: &mut Vec<&str>, jokes: &mut Vec<Entity>| {
        if !current.is_empty() {
            jokes.push(Entity::Joke(Joke {
                text: current.join("\n"),
                position: jokes.len(),
            }));
            current.clear();
        }
    };

    for line in lines {
        if line.trim().is_empty() {
            finalize(&mut current, &mut jokes);
        } else {
            current.push(line.trim_end());
        }
    }
    finalize(&mut current, &mut jokes);

    jokes
}
