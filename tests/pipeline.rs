//! End-to-end pipeline tests: static document source → cache → query
//! engine → response formatter.

use std::sync::Arc;

use songbook_search::cache::EntityCache;
use songbook_search::config::{
    CacheConfig, DocumentEntry, DocumentKind, FormatConfig, ParserConfig,
};
use songbook_search::documents::{RawBlock, StaticSource};
use songbook_search::format::{MessagePart, ResponseFormatter};
use songbook_search::normalize::Normalizer;
use songbook_search::parser::EntityParser;
use songbook_search::search::{QueryEngine, SearchMode};

fn song_table(title: &str, authors: &str, body: &str) -> RawBlock {
    RawBlock::Table {
        rows: vec![
            title.to_string(),
            "strum 4/4".to_string(),
            String::new(),
            authors.to_string(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            body.to_string(),
        ],
    }
}

fn documents() -> Vec<DocumentEntry> {
    vec![
        DocumentEntry {
            id: "songs".to_string(),
            url: "http://unused".to_string(),
            kind: DocumentKind::SongTable,
            source_url: Some("https://docs.example/songbook".to_string()),
        },
        DocumentEntry {
            id: "chords".to_string(),
            url: "http://unused".to_string(),
            kind: DocumentKind::SongMarker,
            source_url: None,
        },
    ]
}

fn cache() -> EntityCache {
    let mut source = StaticSource::new();
    source.insert(
        "songs",
        vec![
            song_table("Gray Bird", "J. Sparrow", "Am F\nfly away, gray bird"),
            song_table("Ёлка", "", "C G\nзимой и летом стройная"),
        ],
    );
    source.insert(
        "chords",
        vec![RawBlock::Paragraph {
            text: "♭ Winter Road\nAuthor Ice Band\nAm\nover the winter road\n\n\nwe go".to_string(),
        }],
    );

    EntityCache::new(
        Arc::new(source),
        EntityParser::new(&ParserConfig::default()).unwrap(),
        &CacheConfig { ttl_seconds: 600 },
        &documents(),
    )
}

#[tokio::test]
async fn table_document_parses_searches_and_renders() {
    let cache = cache();
    let engine = QueryEngine::new(Normalizer::default());
    let formatter = ResponseFormatter::new(&FormatConfig::default());

    let entities = cache.entities("songs").await.unwrap();
    assert_eq!(entities.len(), 2);

    // Locale folding: the query spells the title without the diaeresis.
    let hits = engine.search(&entities, "елка", SearchMode::Title);
    assert_eq!(hits.len(), 1);

    let parts = formatter.format(&hits[0].entity, Some("https://docs.example/songbook"));
    let header = match &parts[0] {
        MessagePart::Text(t) => t,
        other => panic!("expected header text, got {:?}", other),
    };
    // The empty authors row surfaced as the labeled sentinel.
    assert!(header.contains("Authors: authors unknown"));

    let last = match parts.last().unwrap() {
        MessagePart::Text(t) => t,
        other => panic!("expected body text, got {:?}", other),
    };
    assert!(last.contains("https://docs.example/songbook"));
}

#[tokio::test]
async fn marker_document_flows_through_the_same_pipeline() {
    let cache = cache();
    let engine = QueryEngine::new(Normalizer::default());

    let entities = cache.entities("chords").await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].title(), Some("Winter Road"));

    // Blank-line runs collapsed during parsing.
    assert_eq!(
        entities[0].body(),
        Some("Am\nover the winter road\n\nwe go")
    );

    let hits = engine.search(&entities, "winter road", SearchMode::Unscoped);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].entity.position(), 0);
}

#[tokio::test]
async fn lyric_fragment_search_spans_modes() {
    let cache = cache();
    let engine = QueryEngine::new(Normalizer::default());
    let entities = cache.entities("songs").await.unwrap();

    let by_lyrics = engine.search(&entities, "fly away", SearchMode::Lyrics);
    assert_eq!(by_lyrics.len(), 1);
    assert_eq!(by_lyrics[0].entity.title(), Some("Gray Bird"));

    let by_author = engine.search(&entities, "sparrow", SearchMode::Author);
    assert_eq!(by_author.len(), 1);

    let nothing = engine.search(&entities, "fragment that exists nowhere", SearchMode::Unscoped);
    assert!(nothing.is_empty());
}
