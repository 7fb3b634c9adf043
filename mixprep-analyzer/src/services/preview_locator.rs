//! Preview clip search
//!
//! Queries an iTunes-style search API by "artist title" and picks the
//! candidate whose duration best matches the requested track.
//!
//! **Retry policy** (one shared attempt budget per search):
//! - 403/429: back off `backoff_unit * backoff_base^attempt`, then retry
//! - transport or parse failure: pause briefly, then retry
//! - any other non-success status: give up immediately
//!
//! **Matching policy** (only once a search has returned a response):
//! - no usable candidates: search again once with the title reduced to
//!   ASCII letters, digits and spaces, if that changes it
//! - tier 1: first candidate within `strict_tolerance_ms` of the duration
//! - tier 2: first candidate within `relaxed_tolerance_ms`
//! - tier 3: first candidate (always used when no duration is known)

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{PreviewLocate, PreviewReference};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Search API response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "resultCount", default)]
    pub result_count: u64,
    #[serde(default)]
    pub results: Vec<SearchCandidate>,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchCandidate {
    #[serde(rename = "previewUrl")]
    pub preview_url: Option<String>,
    /// Catalog-reported duration; absent counts as 0
    #[serde(rename = "trackTimeMillis")]
    pub track_time_millis: Option<f64>,
    #[serde(rename = "trackName")]
    pub track_name: Option<String>,
    #[serde(rename = "artistName")]
    pub artist_name: Option<String>,
}

impl SearchCandidate {
    fn duration_delta(&self, requested_ms: u64) -> f64 {
        (self.track_time_millis.unwrap_or(0.0) - requested_ms as f64).abs()
    }
}

/// Which duration tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    Strict,
    Relaxed,
    First,
}

/// Pick a candidate by duration tier
///
/// A missing or zero duration skips straight to the first candidate.
pub fn select_candidate<'a>(
    candidates: &'a [SearchCandidate],
    duration_ms: Option<u64>,
    strict_tolerance_ms: u64,
    relaxed_tolerance_ms: u64,
) -> Option<(&'a SearchCandidate, MatchTier)> {
    let first = candidates.first()?;

    let requested = match duration_ms {
        Some(ms) if ms > 0 => ms,
        _ => return Some((first, MatchTier::First)),
    };

    for (tolerance, tier) in [
        (strict_tolerance_ms, MatchTier::Strict),
        (relaxed_tolerance_ms, MatchTier::Relaxed),
    ] {
        if let Some(candidate) = candidates
            .iter()
            .find(|c| c.duration_delta(requested) < tolerance as f64)
        {
            return Some((candidate, tier));
        }
    }

    Some((first, MatchTier::First))
}

/// Keep ASCII letters, digits and spaces
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// Catalog search client
pub struct PreviewLocator {
    http_client: reqwest::Client,
    config: SearchConfig,
}

impl PreviewLocator {
    pub fn new(http_client: reqwest::Client, config: SearchConfig) -> Self {
        Self { http_client, config }
    }

    /// One search request, no retries
    async fn search_once(&self, term: &str) -> Result<Vec<SearchCandidate>, SearchError> {
        let limit = self.config.result_limit.to_string();

        let response = self
            .http_client
            .get(&self.config.endpoint)
            .query(&[
                ("term", term),
                ("media", "music"),
                ("entity", "song"),
                ("limit", limit.as_str()),
            ])
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(|e| SearchError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited(status.as_u16()));
        }
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SearchError::Parse(e.to_string()))?;

        debug!(
            term = %term,
            result_count = body.result_count,
            returned = body.results.len(),
            "Search response"
        );

        Ok(body
            .results
            .into_iter()
            .filter(|c| c.preview_url.as_deref().is_some_and(|url| !url.is_empty()))
            .collect())
    }

    /// Search with the retry policy; `None` once the attempt budget is spent
    /// or on a non-retryable failure
    pub async fn search(&self, term: &str) -> Option<Vec<SearchCandidate>> {
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let is_last = attempt + 1 == max_attempts;

            match self.search_once(term).await {
                Ok(candidates) => return Some(candidates),
                Err(SearchError::RateLimited(code)) => {
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        term = %term,
                        attempt = attempt + 1,
                        status = code,
                        backoff_ms = delay.as_millis() as u64,
                        "Search rate limited"
                    );
                    if !is_last {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(term = %term, attempt = attempt + 1, error = %e, "Search failed, retrying");
                    if !is_last {
                        tokio::time::sleep(self.config.transient_pause()).await;
                    }
                }
                Err(e) => {
                    debug!(term = %term, error = %e, "Search failed");
                    return None;
                }
            }
        }

        warn!(term = %term, attempts = max_attempts, "Search attempts exhausted");
        None
    }
}

#[async_trait::async_trait]
impl PreviewLocate for PreviewLocator {
    async fn locate(&self, artist: &str, title: &str, duration_ms: Option<u64>) -> Option<PreviewReference> {
        let mut candidates = self.search(&format!("{} {}", artist, title)).await?;

        if candidates.is_empty() {
            let cleaned = sanitize_title(title);
            if cleaned != title {
                debug!(title = %title, cleaned = %cleaned, "No results, retrying with sanitized title");
                candidates = self
                    .search(&format!("{} {}", artist, cleaned))
                    .await
                    .unwrap_or_default();
            }
        }

        let (candidate, tier) = select_candidate(
            &candidates,
            duration_ms,
            self.config.strict_tolerance_ms,
            self.config.relaxed_tolerance_ms,
        )?;

        debug!(
            artist = %artist,
            title = %title,
            tier = ?tier,
            matched = candidate.track_name.as_deref().unwrap_or_default(),
            "Preview located"
        );

        candidate.preview_url.clone().map(PreviewReference::new)
    }
}
