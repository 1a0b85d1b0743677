//! In-process stand-ins for the encyclopedia API, served by axum on an
//! ephemeral localhost port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use delve_net::LookupConfig;
use serde_json::json;

pub const API_PATH: &str = "/w/api.php";

/// Scripted misbehaviour for the title-search stage.
#[derive(Clone, Copy, Default)]
pub enum SearchFault {
    #[default]
    None,
    /// Answer 503 for the first n search requests.
    Unavailable(usize),
    /// Answer 404 to every search request.
    NotFoundStatus,
    /// Answer a body that is not JSON.
    Garbage,
    /// Sleep before answering.
    Slow(Duration),
}

#[derive(Default)]
pub struct FakeWiki {
    /// lowercase query -> canonical title
    pub titles: HashMap<String, String>,
    /// canonical title -> original image source
    pub images: HashMap<String, String>,
    pub search_fault: SearchFault,
    pub search_hits: AtomicUsize,
    pub media_hits: AtomicUsize,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, query: &str, title: &str, image: Option<&str>) -> Self {
        self.titles.insert(query.to_lowercase(), title.to_string());
        if let Some(src) = image {
            self.images.insert(title.to_string(), src.to_string());
        }
        self
    }

    pub fn fault(mut self, fault: SearchFault) -> Self {
        self.search_fault = fault;
        self
    }

    pub fn searches(&self) -> usize {
        self.search_hits.load(Ordering::SeqCst)
    }

    pub fn media_fetches(&self) -> usize {
        self.media_hits.load(Ordering::SeqCst)
    }
}

async fn api(
    State(wiki): State<Arc<FakeWiki>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let param = |k: &str| params.get(k).map(String::as_str).unwrap_or("");
    if param("format") != "json" || param("origin") != "*" {
        return (StatusCode::BAD_REQUEST, "format=json&origin=* required").into_response();
    }

    match param("action") {
        "opensearch" => {
            let hit = wiki.search_hits.fetch_add(1, Ordering::SeqCst) + 1;
            if param("limit") != "1" || param("namespace") != "0" {
                return (StatusCode::BAD_REQUEST, "limit=1&namespace=0 required").into_response();
            }
            match wiki.search_fault {
                SearchFault::Unavailable(n) if hit <= n => {
                    return StatusCode::SERVICE_UNAVAILABLE.into_response();
                }
                SearchFault::NotFoundStatus => return StatusCode::NOT_FOUND.into_response(),
                SearchFault::Garbage => return "<html>oops</html>".into_response(),
                SearchFault::Slow(d) => tokio::time::sleep(d).await,
                _ => {}
            }
            let query = param("search");
            let titles: Vec<&String> = wiki.titles.get(&query.to_lowercase()).into_iter().collect();
            axum::Json(json!([query, titles, [""], []])).into_response()
        }
        "query" => {
            wiki.media_hits.fetch_add(1, Ordering::SeqCst);
            if param("prop") != "pageimages" || param("piprop") != "original" {
                return (StatusCode::BAD_REQUEST, "prop=pageimages&piprop=original required")
                    .into_response();
            }
            let title = param("titles");
            let mut page = json!({"pageid": 4242, "ns": 0, "title": title});
            if let Some(src) = wiki.images.get(title) {
                page["original"] = json!({"source": src, "width": 1024, "height": 768});
            }
            axum::Json(json!({"batchcomplete": "", "query": {"pages": {"4242": page}}}))
                .into_response()
        }
        _ => (StatusCode::BAD_REQUEST, "unknown action").into_response(),
    }
}

/// Serve `wiki` and return its `api.php` URL.
pub async fn serve(wiki: Arc<FakeWiki>) -> String {
    let app = Router::new().route(API_PATH, get(api)).with_state(wiki);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}{API_PATH}")
}

/// A URL on a port nothing listens on.
pub async fn closed_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}{API_PATH}")
}

pub fn config(api_url: String) -> LookupConfig {
    LookupConfig {
        api_url,
        min_interval_ms: 1,
        request_timeout_ms: 2_000,
        backoff_ms: 5,
        ..LookupConfig::default()
    }
}
