//! # API Server Module
//!
//! ## Purpose
//! REST boundary standing in for the chat transport: receives free-text
//! queries, returns the query engine's matches and the formatter's ordered
//! message parts for the caller to deliver in order.
//!
//! ## Input/Output Specification
//! - **Input**: HTTP requests with chat text or scoped search queries
//! - **Output**: JSON responses with message parts, match lists, status
//! - **Endpoints**: chat, search, entity re-selection, jokes, strumming,
//!   health, stats, forced refresh
//!
//! ## Key Features
//! - Inline result capping and refinement prompts (presentation policy —
//!   the engine itself is never capped)
//! - Canned replies consulted before search
//! - User-visible failures are generic; detail goes to the logs

use crate::config::{DocumentEntry, DocumentKind};
use crate::errors::{Result, SongbookError};
use crate::format::MessagePart;
use crate::search::{MatchField, SearchMode};
use crate::utils::{preview, Timer};
use crate::{AppState, Entity};
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use tracing::{error, info};

/// REST API server over the shared application state
pub struct ApiServer {
    app_state: AppState,
}

/// Free-text chat request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Chat response: exactly one of `parts`, `matches` or `message` is the
/// payload; `message` alone means there is nothing to render
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<MessagePart>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchRef>>,
    pub total_matches: usize,
}

/// Scoped search request
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub document: String,
    pub query: String,
    #[serde(default = "default_mode")]
    pub mode: SearchMode,
}

fn default_mode() -> SearchMode {
    SearchMode::Unscoped
}

/// Scoped search response; the match list is uncapped
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<MatchRef>,
    pub total_results: usize,
    pub query_time_ms: u64,
}

/// Stable reference to a matched entity, usable for re-selection
#[derive(Debug, Serialize)]
pub struct MatchRef {
    pub document: String,
    pub position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub matched: MatchField,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub documents: usize,
}

impl ApiServer {
    /// Create new API server
    pub fn new(app_state: AppState) -> Self {
        Self { app_state }
    }

    /// Run the API server until the process is stopped
    pub async fn run(self) -> Result<()> {
        let bind_addr = format!(
            "{}:{}",
            self.app_state.config.server.host, self.app_state.config.server.port
        );
        let enable_cors = self.app_state.config.server.enable_cors;
        let app_state = self.app_state;

        info!("starting API server on {}", bind_addr);

        let server = HttpServer::new(move || {
            let cors = if enable_cors {
                Cors::permissive()
            } else {
                Cors::default()
            };
            App::new()
                .wrap(cors)
                .app_data(web::Data::new(app_state.clone()))
                .route("/chat", web::post().to(chat_handler))
                .route("/search", web::post().to(search_handler))
                .route("/songs/{document}/{position}", web::get().to(entity_handler))
                .route("/joke", web::get().to(joke_handler))
                .route("/strumming", web::get().to(strumming_handler))
                .route("/documents/{document}/refresh", web::post().to(refresh_handler))
                .route("/health", web::get().to(health_handler))
                .route("/stats", web::get().to(stats_handler))
        })
        .bind(&bind_addr)
        .map_err(|e| SongbookError::Internal {
            message: format!("failed to bind server to {}: {}", bind_addr, e),
        })?
        .run();

        server.await.map_err(|e| SongbookError::Internal {
            message: format!("server error: {}", e),
        })?;

        Ok(())
    }
}

/// Documents the chat flow searches (everything except joke collections)
fn searchable_documents(state: &AppState) -> impl Iterator<Item = &DocumentEntry> {
    state
        .config
        .documents
        .entries
        .iter()
        .filter(|entry| entry.kind != DocumentKind::Jokes)
}

/// Free-text chat endpoint: canned replies first, then unscoped search
/// across all registered song and strumming documents
async fn chat_handler(
    state: web::Data<AppState>,
    request: web::Json<ChatRequest>,
) -> ActixResult<HttpResponse> {
    let timer = Timer::new("chat");
    let text = request.text.trim();
    let format = &state.config.format;

    if let Some(reply) = canned_reply(&state, text) {
        return Ok(HttpResponse::Ok().json(ChatResponse {
            message: Some(reply),
            parts: None,
            matches: None,
            total_matches: 0,
        }));
    }

    if text.chars().count() < state.config.search.min_query_length {
        return Ok(HttpResponse::Ok().json(ChatResponse {
            message: Some(format.nothing_found_text.clone()),
            parts: None,
            matches: None,
            total_matches: 0,
        }));
    }

    let mut matches: Vec<(DocumentEntry, crate::search::SearchHit)> = Vec::new();
    let mut documents_seen = 0usize;

    for entry in searchable_documents(&state) {
        match state.cache.entities(&entry.id).await {
            Ok(entities) => {
                documents_seen += 1;
                for hit in state.engine.search(&entities, text, SearchMode::Unscoped) {
                    matches.push((entry.clone(), hit));
                }
            }
            Err(e) => {
                error!(document = entry.id.as_str(), error = %e, "chat search skipped document");
            }
        }
    }

    let elapsed = timer.stop();
    info!(
        query = preview(text, 60).as_str(),
        matches = matches.len(),
        elapsed_ms = elapsed,
        "chat query handled"
    );

    if documents_seen == 0 {
        return Ok(HttpResponse::Ok().json(ChatResponse {
            message: Some(format.failure_text.clone()),
            parts: None,
            matches: None,
            total_matches: 0,
        }));
    }

    let total_matches = matches.len();
    let response = match total_matches {
        0 => ChatResponse {
            message: Some(format.nothing_found_text.clone()),
            parts: None,
            matches: None,
            total_matches,
        },
        1 => {
            let (entry, hit) = matches.remove(0);
            ChatResponse {
                message: None,
                parts: Some(state.formatter.format(&hit.entity, entry.source_url.as_deref())),
                matches: None,
                total_matches,
            }
        }
        _ => {
            // Presentation policy: the engine returned everything, the
            // boundary shows at most the configured inline maximum.
            let max_inline = state.config.search.max_inline_results;
            let refs = matches
                .iter()
                .take(max_inline)
                .map(|(entry, hit)| match_ref(&entry.id, hit))
                .collect();
            ChatResponse {
                message: (total_matches > max_inline)
                    .then(|| format.refine_text.clone()),
                parts: None,
                matches: Some(refs),
                total_matches,
            }
        }
    };

    Ok(HttpResponse::Ok().json(response))
}

/// Scoped search endpoint: returns the engine's uncapped match list
async fn search_handler(
    state: web::Data<AppState>,
    request: web::Json<SearchRequest>,
) -> ActixResult<HttpResponse> {
    let timer = Timer::new("search");

    let entities = match state.cache.entities(&request.document).await {
        Ok(entities) => entities,
        Err(e) => return Ok(service_unavailable(&state, &request.document, e)),
    };

    let results: Vec<MatchRef> = state
        .engine
        .search(&entities, &request.query, request.mode)
        .iter()
        .map(|hit| match_ref(&request.document, hit))
        .collect();

    let total_results = results.len();
    Ok(HttpResponse::Ok().json(SearchResponse {
        results,
        total_results,
        query_time_ms: timer.stop(),
    }))
}

/// Re-selection by stable identity: document plus source position
async fn entity_handler(
    state: web::Data<AppState>,
    path: web::Path<(String, usize)>,
) -> ActixResult<HttpResponse> {
    let (document, position) = path.into_inner();

    let entities = match state.cache.entities(&document).await {
        Ok(entities) => entities,
        Err(e) => return Ok(service_unavailable(&state, &document, e)),
    };

    let source_url = state
        .config
        .documents
        .entries
        .iter()
        .find(|entry| entry.id == document)
        .and_then(|entry| entry.source_url.clone());

    match entities.iter().find(|e| e.position() == position) {
        Some(entity) => Ok(HttpResponse::Ok()
            .json(state.formatter.format(entity, source_url.as_deref()))),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": "no entity at this position",
        }))),
    }
}

/// Round-robin joke delivery across all joke documents
async fn joke_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut jokes: Vec<Entity> = Vec::new();
    for entry in &state.config.documents.entries {
        if entry.kind != DocumentKind::Jokes {
            continue;
        }
        match state.cache.entities(&entry.id).await {
            Ok(entities) => jokes.extend(entities.iter().cloned()),
            Err(e) => error!(document = entry.id.as_str(), error = %e, "joke document skipped"),
        }
    }

    if jokes.is_empty() {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": state.config.format.nothing_found_text,
        })));
    }

    let index = state.joke_cursor.fetch_add(1, Ordering::Relaxed) % jokes.len();
    Ok(HttpResponse::Ok().json(state.formatter.format(&jokes[index], None)))
}

/// List all parsed strumming patterns
async fn strumming_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    let mut patterns: Vec<Entity> = Vec::new();
    for entry in &state.config.documents.entries {
        if entry.kind != DocumentKind::StrummingTable {
            continue;
        }
        match state.cache.entities(&entry.id).await {
            Ok(entities) => patterns.extend(entities.iter().cloned()),
            Err(e) => {
                error!(document = entry.id.as_str(), error = %e, "strumming document skipped")
            }
        }
    }

    Ok(HttpResponse::Ok().json(patterns))
}

/// Force a document refresh regardless of snapshot age
async fn refresh_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let document = path.into_inner();
    match state.cache.refresh(&document).await {
        Ok(entities) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "document": document,
            "entities": entities.len(),
        }))),
        Err(e) => Ok(service_unavailable(&state, &document, e)),
    }
}

/// Health check endpoint handler
async fn health_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.config.documents.entries.len(),
    }))
}

/// Cache statistics endpoint handler
async fn stats_handler(state: web::Data<AppState>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.cache.stats()))
}

fn canned_reply(state: &AppState, text: &str) -> Option<String> {
    let normalized = state.engine.normalize(text);
    state
        .config
        .replies
        .iter()
        .find(|reply| state.engine.normalize(&reply.trigger) == normalized)
        .map(|reply| reply.reply.clone())
}

fn match_ref(document: &str, hit: &crate::search::SearchHit) -> MatchRef {
    MatchRef {
        document: document.to_string(),
        position: hit.entity.position(),
        title: hit.entity.title().map(str::to_string),
        matched: hit.matched,
    }
}

/// Map a pipeline error to the generic user-visible failure; detail is
/// logged, never surfaced.
fn service_unavailable(
    state: &AppState,
    document: &str,
    error: SongbookError,
) -> HttpResponse {
    error!(document, error = %error, category = error.category(), "request failed");
    HttpResponse::ServiceUnavailable().json(serde_json::json!({
        "error": state.config.format.failure_text,
    }))
}
