//! # Positional Table Parsing
//!
//! ## Purpose
//! Parses row-table blocks whose rows carry fixed positional meaning. The
//! row-index-to-field mapping is an explicit schema: an ordered list of
//! named field extractors applied to a fixed-shape block, validated once
//! up front so a wrong-shaped block fails fast as `MalformedBlock` instead
//! of being indexed blindly.

use crate::config::ParserConfig;
use crate::errors::{Result, SongbookError};
use crate::{Song, StrummingPattern};

/// Named field a schema row extracts into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Title,
    Rhythm,
    Group,
    Authors,
    Features,
    Voice,
    Video,
    VideoUrl,
    Lyrics,
    Photo,
}

/// Ordered field extractors for one fixed-shape table kind
pub struct TableSchema {
    pub name: &'static str,
    pub fields: &'static [FieldName],
}

/// Song tables: nine rows, one field per row index
pub const SONG_SCHEMA: TableSchema = TableSchema {
    name: "song",
    fields: &[
        FieldName::Title,
        FieldName::Rhythm,
        FieldName::Group,
        FieldName::Authors,
        FieldName::Features,
        FieldName::Voice,
        FieldName::Video,
        FieldName::VideoUrl,
        FieldName::Lyrics,
    ],
};

/// Strumming pattern tables: five rows
pub const STRUMMING_SCHEMA: TableSchema = TableSchema {
    name: "strumming",
    fields: &[
        FieldName::Title,
        FieldName::Features,
        FieldName::Photo,
        FieldName::Voice,
        FieldName::Video,
    ],
};

/// Field values extracted from one validated block. Empty rows are absent.
struct ExtractedFields<'a> {
    schema: &'static TableSchema,
    rows: &'a [String],
}

impl<'a> ExtractedFields<'a> {
    /// Validate the block shape against the schema
    fn extract(
        schema: &'static TableSchema,
        rows: &'a [String],
        document: &str,
        block_index: usize,
    ) -> Result<Self> {
        if rows.len() != schema.fields.len() {
            return Err(SongbookError::MalformedBlock {
                document: document.to_string(),
                index: block_index,
                details: format!(
                    "{} table needs {} rows, found {}",
                    schema.name,
                    schema.fields.len(),
                    rows.len()
                ),
            });
        }
        Ok(Self { schema, rows })
    }

    /// Get a field's trimmed value, `None` when the row is empty
    fn get(&self, field: FieldName) -> Option<&'a str> {
        let row = self.schema.fields.iter().position(|f| *f == field)?;
        let value = self.rows[row].trim();
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// Parse one song table block into a `Song` at the given source position
pub fn parse_song_table(
    config: &ParserConfig,
    rows: &[String],
    document: &str,
    block_index: usize,
    position: usize,
) -> Result<Song> {
    let fields = ExtractedFields::extract(&SONG_SCHEMA, rows, document, block_index)?;

    let title = fields.get(FieldName::Title).ok_or_else(|| {
        SongbookError::MalformedBlock {
            document: document.to_string(),
            index: block_index,
            details: "empty title row".to_string(),
        }
    })?;

    Ok(Song {
        title: title.to_string(),
        // The formatter always labels the authors line, so an empty row
        // becomes the sentinel rather than a blank value.
        authors: fields
            .get(FieldName::Authors)
            .unwrap_or(&config.authors_unknown)
            .to_string(),
        rhythm: fields.get(FieldName::Rhythm).unwrap_or("").to_string(),
        group: fields.get(FieldName::Group).map(str::to_string),
        features: fields.get(FieldName::Features).map(str::to_string),
        voice: fields.get(FieldName::Voice).map(str::to_string),
        video: fields.get(FieldName::Video).map(str::to_string),
        video_url: fields.get(FieldName::VideoUrl).map(str::to_string),
        body: fields.get(FieldName::Lyrics).unwrap_or("").to_string(),
        position,
    })
}

/// Parse one strumming pattern table block
pub fn parse_strumming_table(
    rows: &[String],
    document: &str,
    block_index: usize,
    position: usize,
) -> Result<StrummingPattern> {
    let fields = ExtractedFields::extract(&STRUMMING_SCHEMA, rows, document, block_index)?;

    let title = fields.get(FieldName::Title).ok_or_else(|| {
        SongbookError::MalformedBlock {
            document: document.to_string(),
            index: block_index,
            details: "empty title row".to_string(),
        }
    })?;

    Ok(StrummingPattern {
        title: title.to_string(),
        features: fields.get(FieldName::Features).map(str::to_string),
        photo: fields.get(FieldName::Photo).map(str::to_string),
        voice: fields.get(FieldName::Voice).map(str::to_string),
        video: fields.get(FieldName::Video).map(str::to_string),
        position,
    })
}
