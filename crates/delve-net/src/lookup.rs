//! Encyclopedia image lookup.
//!
//! `query → TITLE_SEARCH → MEDIA_FETCH → url`, with every unresolved or
//! failed stage ending the lookup early. The whole two-stage lookup is one
//! unit of throttled work; the stages themselves are not spaced.
//!
//! Endpoints (MediaWiki action API):
//!   opensearch:  action=opensearch&search=..&limit=1&namespace=0
//!   pageimages:  action=query&titles=..&prop=pageimages&piprop=original

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::{NetError, Result};
use crate::throttle::Throttle;

pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";

const MAX_BACKOFF_MS: u64 = 60_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// MediaWiki `api.php` endpoint.
    pub api_url: String,
    /// Minimum spacing between the starts of two lookups.
    pub min_interval_ms: u64,
    /// Total attempts per stage; only transient failures are retried.
    pub max_attempts: u32,
    /// Deadline for each stage request.
    pub request_timeout_ms: u64,
    /// First retry delay; doubles on every further attempt.
    pub backoff_ms: u64,
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            min_interval_ms: 100,
            max_attempts: 1,
            request_timeout_ms: 5_000,
            backoff_ms: 200,
            user_agent: concat!("delve/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    TitleSearch,
    MediaFetch,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::TitleSearch => "title_search",
            Stage::MediaFetch => "media_fetch",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a lookup ended. Callers that only care about the image use
/// [`LookupOutcome::into_url`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(String),
    /// The stage answered, but with nothing usable.
    NotFound(Stage),
    TimedOut(Stage),
    Failed { stage: Stage, reason: String },
}

impl LookupOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            LookupOutcome::Found(url) => Some(url),
            _ => None,
        }
    }

    pub fn into_url(self) -> Option<String> {
        match self {
            LookupOutcome::Found(url) => Some(url),
            _ => None,
        }
    }

    /// Stage the lookup stopped at, if it did not succeed.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            LookupOutcome::Found(_) => None,
            LookupOutcome::NotFound(stage) | LookupOutcome::TimedOut(stage) => Some(*stage),
            LookupOutcome::Failed { stage, .. } => Some(*stage),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LookupOutcome::Found(_) => "found",
            LookupOutcome::NotFound(_) => "not_found",
            LookupOutcome::TimedOut(_) => "timed_out",
            LookupOutcome::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupOutcome::Found(url) => f.write_str(url),
            LookupOutcome::NotFound(stage) => write!(f, "not found ({stage})"),
            LookupOutcome::TimedOut(stage) => write!(f, "timed out ({stage})"),
            LookupOutcome::Failed { stage, reason } => write!(f, "failed ({stage}): {reason}"),
        }
    }
}

pub struct ImageLookup {
    http: reqwest::Client,
    config: LookupConfig,
    throttle: Arc<Throttle>,
}

impl ImageLookup {
    /// Build a lookup with its own throttle from `config.min_interval_ms`.
    pub fn new(config: LookupConfig) -> Result<Self> {
        let throttle = Arc::new(Throttle::from_millis(config.min_interval_ms));
        Self::with_throttle(config, throttle)
    }

    /// Build a lookup that shares an existing throttle.
    pub fn with_throttle(config: LookupConfig, throttle: Arc<Throttle>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config,
            throttle,
        })
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn throttle(&self) -> &Arc<Throttle> {
        &self.throttle
    }

    /// Resolve `query` to an image. Never fails: errors become outcomes.
    #[instrument(skip(self))]
    pub async fn lookup(&self, query: &str) -> LookupOutcome {
        let outcome = self.throttle.run(|| self.resolve(query)).await;
        match &outcome {
            LookupOutcome::Found(url) => info!(url = url.as_str(), "image found"),
            LookupOutcome::NotFound(stage) => info!(%stage, "no image"),
            other => warn!("image lookup degraded: {other}"),
        }
        outcome
    }

    /// The null/non-null view of [`lookup`](Self::lookup).
    pub async fn image_url(&self, query: &str) -> Option<String> {
        self.lookup(query).await.into_url()
    }

    async fn resolve(&self, query: &str) -> LookupOutcome {
        let query = query.trim();
        if query.is_empty() {
            return LookupOutcome::NotFound(Stage::TitleSearch);
        }

        let title = match self
            .stage(Stage::TitleSearch, || self.search_title(query))
            .await
        {
            Ok(Some(title)) => title,
            Ok(None) => {
                debug!(query, "no page for query");
                return LookupOutcome::NotFound(Stage::TitleSearch);
            }
            Err(outcome) => return outcome,
        };
        debug!(title = title.as_str(), "page title found");

        match self
            .stage(Stage::MediaFetch, || self.fetch_image(&title))
            .await
        {
            Ok(Some(url)) => LookupOutcome::Found(url),
            Ok(None) => {
                debug!(title = title.as_str(), "page has no original image");
                LookupOutcome::NotFound(Stage::MediaFetch)
            }
            Err(outcome) => outcome,
        }
    }

    /// Run one stage under its deadline, retrying transient failures.
    async fn stage<T, F, Fut>(
        &self,
        stage: Stage,
        mut attempt_once: F,
    ) -> std::result::Result<Option<T>, LookupOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let deadline = self.stage_deadline();
        let mut attempt = 1;

        loop {
            let err = match tokio::time::timeout(deadline, attempt_once()).await {
                Ok(Ok(found)) => return Ok(found),
                Ok(Err(e)) => e,
                Err(_) => NetError::Timeout(deadline),
            };

            if attempt < max_attempts && err.is_transient() {
                let delay = self.backoff(attempt);
                warn!(
                    %stage,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "lookup stage failed, retrying: {err}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            warn!(%stage, attempt, "lookup stage failed: {err}");
            return Err(match err {
                NetError::Timeout(_) => LookupOutcome::TimedOut(stage),
                other => LookupOutcome::Failed {
                    stage,
                    reason: other.to_string(),
                },
            });
        }
    }

    fn stage_deadline(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms.max(1))
    }

    /// `backoff_ms * 2^(attempt-1)`, capped at a minute, plus up to 25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self
            .config
            .backoff_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(16))
            .min(MAX_BACKOFF_MS);
        let jitter = if base >= 4 {
            rand::rng().random_range(0..=base / 4)
        } else {
            0
        };
        Duration::from_millis(base.saturating_add(jitter))
    }

    async fn search_title(&self, query: &str) -> Result<Option<String>> {
        debug!(query, "searching for page title");
        let body = self
            .get_json(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", "1"),
                ("namespace", "0"),
                ("format", "json"),
                ("origin", "*"),
            ])
            .await?;
        parse_opensearch(&body)
    }

    async fn fetch_image(&self, title: &str) -> Result<Option<String>> {
        debug!(title, "fetching page image");
        let body = self
            .get_json(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "pageimages"),
                ("piprop", "original"),
                ("format", "json"),
                ("origin", "*"),
            ])
            .await?;
        parse_page_image(&body)
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .http
            .get(&self.config.api_url)
            .query(params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NetError::Status {
                status: status.as_u16(),
                message: String::new(),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| NetError::Decode(e.to_string()))
    }
}

/// opensearch answers `[query, [titles], [descriptions], [urls]]`.
fn parse_opensearch(body: &Value) -> Result<Option<String>> {
    let titles = body
        .get(1)
        .and_then(Value::as_array)
        .ok_or_else(|| NetError::Decode("opensearch response has no title list".into()))?;
    Ok(titles
        .first()
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string))
}

/// pageimages answers `{"query": {"pages": {"<id>": {"original": {"source": ..}}}}}`.
fn parse_page_image(body: &Value) -> Result<Option<String>> {
    let pages = body
        .pointer("/query/pages")
        .and_then(Value::as_object)
        .ok_or_else(|| NetError::Decode("pageimages response has no query.pages".into()))?;
    Ok(pages
        .values()
        .next()
        .and_then(|page| page.pointer("/original/source"))
        .and_then(Value::as_str)
        .map(str::to_string))
}
