//! # Query Engine Module
//!
//! ## Purpose
//! Executes author/title/lyric queries against a parsed entity snapshot.
//! Matching is substring containment over normalized text; disambiguation
//! ordering is deterministic so repeated queries list results identically.
//!
//! ## Input/Output Specification
//! - **Input**: Entity snapshot, raw query string, search mode
//! - **Output**: Ordered match list — zero, one, or many
//! - **Ordering**: title matches before body-only matches, then ascending
//!   source position; duplicates removed by source position
//!
//! ## Key Features
//! - Mode-scoped field selection (author | title | lyrics | unscoped)
//! - Locale-aware normalization of both query and entity fields
//! - Uncapped results: the inline maximum is presentation policy, applied
//!   at the boundary, never here

use crate::normalize::Normalizer;
use crate::Entity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Field scope of a search query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Substring containment against the authors field
    Author,
    /// Substring containment against the title field
    Title,
    /// Substring containment against the combined lyric/chord body
    Lyrics,
    /// Title OR body, title matches ranked first
    Unscoped,
}

/// Which field a hit matched in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchField {
    Title,
    Body,
    Authors,
}

/// One search match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// The matched entity
    pub entity: Entity,
    /// The field the query was found in
    pub matched: MatchField,
}

/// Mode-scoped substring query engine
pub struct QueryEngine {
    normalizer: Normalizer,
}

impl QueryEngine {
    pub fn new(normalizer: Normalizer) -> Self {
        Self { normalizer }
    }

    /// Canonicalize text with the engine's normalizer (used by the boundary
    /// for canned-reply matching)
    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    /// Search the snapshot. Returns the full match list uncapped; an empty
    /// query yields no matches.
    pub fn search(&self, entities: &[Entity], query: &str, mode: SearchMode) -> Vec<SearchHit> {
        let needle = self.normalizer.normalize(query);
        let needle = needle.trim();
        if needle.is_empty() {
            return Vec::new();
        }

        let hits = match mode {
            SearchMode::Author => self.field_matches(entities, needle, MatchField::Authors),
            SearchMode::Title => self.field_matches(entities, needle, MatchField::Title),
            SearchMode::Lyrics => self.field_matches(entities, needle, MatchField::Body),
            SearchMode::Unscoped => self.unscoped_matches(entities, needle),
        };

        debug!(query, ?mode, matches = hits.len(), "search executed");
        hits
    }

    fn field_matches(
        &self,
        entities: &[Entity],
        needle: &str,
        field: MatchField,
    ) -> Vec<SearchHit> {
        entities
            .iter()
            .filter(|entity| self.field_contains(entity, needle, field))
            .map(|entity| SearchHit {
                entity: entity.clone(),
                matched: field,
            })
            .collect()
    }

    /// Union of title and body matches, deduplicated by source position.
    /// Title matches come first, each group in ascending position order —
    /// `entities` is already in position order, so two stable passes do it.
    fn unscoped_matches(&self, entities: &[Entity], needle: &str) -> Vec<SearchHit> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut hits = Vec::new();

        for entity in entities {
            if self.field_contains(entity, needle, MatchField::Title)
                && seen.insert(entity.position())
            {
                hits.push(SearchHit {
                    entity: entity.clone(),
                    matched: MatchField::Title,
                });
            }
        }

        for entity in entities {
            if self.field_contains(entity, needle, MatchField::Body)
                && seen.insert(entity.position())
            {
                hits.push(SearchHit {
                    entity: entity.clone(),
                    matched: MatchField::Body,
                });
            }
        }

        hits
    }

    fn field_contains(&self, entity: &Entity, needle: &str, field: MatchField) -> bool {
        let haystack = match field {
            MatchField::Title => entity.title(),
            MatchField::Body => entity.body(),
            MatchField::Authors => entity.authors(),
        };
        haystack
            .map(|text| self.normalizer.normalize(text).contains(needle))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Song;

    fn song(position: usize, title: &str, authors: &str, body: &str) -> Entity {
        Entity::Song(Song {
            title: title.to_string(),
            authors: authors.to_string(),
            rhythm: String::new(),
            group: None,
            features: None,
            voice: None,
            video: None,
            video_url: None,
            body: body.to_string(),
            position,
        })
    }

    fn engine() -> QueryEngine {
        QueryEngine::new(Normalizer::default())
    }

    fn snapshot() -> Vec<Entity> {
        vec![
            song(0, "Gray Bird", "J. Sparrow", "fly away now\ngray bird of mine"),
            song(1, "Winter Road", "Ice Band", "the gray bird returns\nover winter road"),
            song(2, "Ёлка", "Forest Choir", "зимой и летом стройная"),
        ]
    }

    #[test]
    fn unique_title_substring_returns_one_match() {
        let hits = engine().search(&snapshot(), "WINTER", SearchMode::Title);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.title(), Some("Winter Road"));
    }

    #[test]
    fn matching_ignores_case_and_punctuation() {
        let hits = engine().search(&snapshot(), "gray bird!", SearchMode::Title);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.position(), 0);
    }

    #[test]
    fn locale_variants_match() {
        let hits = engine().search(&snapshot(), "елка", SearchMode::Title);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.position(), 2);
    }

    #[test]
    fn absent_fragment_returns_empty() {
        let hits = engine().search(&snapshot(), "no such fragment", SearchMode::Unscoped);
        assert!(hits.is_empty());
    }

    #[test]
    fn author_mode_searches_authors_only() {
        let hits = engine().search(&snapshot(), "sparrow", SearchMode::Author);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.position(), 0);
    }

    #[test]
    fn unscoped_ranks_title_matches_before_body_matches() {
        // "gray bird" is in song 1's body (position 1, earlier than nothing)
        // and in song 0's title and body. Title match must come first even
        // though the body-only entity also matches at a low position.
        let entities = vec![
            song(0, "Winter Road", "Ice Band", "the gray bird returns"),
            song(1, "Gray Bird", "J. Sparrow", "fly away now"),
        ];
        let hits = engine().search(&entities, "gray bird", SearchMode::Unscoped);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity.position(), 1);
        assert_eq!(hits[0].matched, MatchField::Title);
        assert_eq!(hits[1].entity.position(), 0);
        assert_eq!(hits[1].matched, MatchField::Body);
    }

    #[test]
    fn unscoped_deduplicates_by_position() {
        let hits = engine().search(&snapshot(), "gray bird", SearchMode::Unscoped);
        // Song 0 matches in both title and body but appears once.
        assert_eq!(hits.len(), 2);
        let positions: Vec<usize> = hits.iter().map(|h| h.entity.position()).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let hits = engine().search(&snapshot(), "  ?! ", SearchMode::Unscoped);
        assert!(hits.is_empty());
    }
}
