//! # Line Classification Module
//!
//! ## Purpose
//! Single declarative classifier for marker-document lines: an ordered list
//! of `(pattern, label)` rules evaluated once per line, ties broken by rule
//! order. The rule inputs (marker glyph, author prefixes, chord token
//! pattern) come from configuration so notation- or locale-specific tokens
//! change without touching the state machine.

use crate::config::ParserConfig;
use crate::errors::{Result, SongbookError};
use regex::Regex;

/// Classification of one marker-document line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLabel {
    /// Empty or whitespace-only line
    Blank,
    /// Title line: starts with the reserved marker glyph
    Title,
    /// Metadata line starting with an author prefix keyword
    Author,
    /// Line consisting entirely of chord tokens; starts the body
    Chords,
    /// Anything else
    Text,
}

/// Ordered rule table; the first matching rule wins
pub struct LineClassifier {
    rules: Vec<(Regex, LineLabel)>,
}

impl LineClassifier {
    /// Build the rule table from parser configuration
    pub fn new(config: &ParserConfig) -> Result<Self> {
        let mut rules = Vec::new();

        rules.push((compile(r"^\s*$")?, LineLabel::Blank));

        let marker = regex::escape(&config.marker_glyph);
        rules.push((compile(&format!(r"^\s*{}", marker))?, LineLabel::Title));

        // Metadata prefixes are checked before the chord pattern: a line is
        // only a body opener once no metadata rule claims it.
        if !config.author_prefixes.is_empty() {
            let prefixes = config
                .author_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            rules.push((
                compile(&format!(r"(?i)^\s*(?:{})", prefixes))?,
                LineLabel::Author,
            ));
        }

        let token = &config.chord_token_pattern;
        rules.push((
            compile(&format!(r"^\s*(?:{t})(?:\s+(?:{t}))*\s*$", t = token))?,
            LineLabel::Chords,
        ));

        Ok(Self { rules })
    }

    /// Classify one line; falls through to `Text` when no rule matches
    pub fn classify(&self, line: &str) -> LineLabel {
        for (pattern, label) in &self.rules {
            if pattern.is_match(line) {
                return *label;
            }
        }
        LineLabel::Text
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| SongbookError::Config {
        message: format!("invalid classifier pattern '{}': {}", pattern, e),
    })
}
