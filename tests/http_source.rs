//! HTTP document source tests against a mock upstream.

use std::sync::Arc;

use songbook_search::cache::EntityCache;
use songbook_search::config::{
    CacheConfig, DocumentEntry, DocumentKind, DocumentsConfig, ParserConfig,
};
use songbook_search::documents::{DocumentSource, HttpDocumentSource, RawBlock};
use songbook_search::errors::SongbookError;
use songbook_search::parser::EntityParser;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn song_rows() -> serde_json::Value {
    serde_json::json!({
        "kind": "table",
        "rows": ["Gray Bird", "4/4", "", "J. Sparrow", "", "", "", "", "Am\nfly away"],
    })
}

fn documents_config(server_url: &str) -> DocumentsConfig {
    DocumentsConfig {
        entries: vec![DocumentEntry {
            id: "songs".to_string(),
            url: format!("{}/export/songs", server_url),
            kind: DocumentKind::SongTable,
            source_url: None,
        }],
        fetch_timeout_seconds: 5,
    }
}

#[tokio::test]
async fn fetches_and_decodes_block_export() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/songs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([song_rows()])))
        .mount(&server)
        .await;

    let source = HttpDocumentSource::new(&documents_config(&server.uri())).unwrap();
    let blocks = source.fetch_blocks("songs").await.unwrap();

    assert_eq!(blocks.len(), 1);
    match &blocks[0] {
        RawBlock::Table { rows } => assert_eq!(rows[0], "Gray Bird"),
        other => panic!("expected table block, got {:?}", other),
    }
}

#[tokio::test]
async fn upstream_error_is_fetch_failed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/songs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let source = HttpDocumentSource::new(&documents_config(&server.uri())).unwrap();
    match source.fetch_blocks("songs").await {
        Err(SongbookError::FetchFailed { document, .. }) => assert_eq!(document, "songs"),
        other => panic!("expected FetchFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn zero_blocks_is_empty_document() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/songs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let source = HttpDocumentSource::new(&documents_config(&server.uri())).unwrap();
    match source.fetch_blocks("songs").await {
        Err(SongbookError::EmptyDocument { .. }) => {}
        other => panic!("expected EmptyDocument, got {:?}", other),
    }
}

#[tokio::test]
async fn cache_serves_stale_snapshot_through_upstream_outage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/export/songs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([song_rows()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/export/songs"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let config = documents_config(&server.uri());
    let cache = EntityCache::new(
        Arc::new(HttpDocumentSource::new(&config).unwrap()),
        EntityParser::new(&ParserConfig::default()).unwrap(),
        // ttl 0: the second call always attempts a refresh
        &CacheConfig { ttl_seconds: 0 },
        &config.entries,
    );

    let first = cache.entities("songs").await.unwrap();
    assert_eq!(first.len(), 1);

    let stale = cache.entities("songs").await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].title(), Some("Gray Bird"));
}
