//! Multi-page scraping session
//!
//! Fetches page 1, discovers how many result pages exist, then fetches and
//! parses the remaining pages in order. A failing page contributes an error
//! record and zero ads; it never ends the session.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RendererError;
use crate::models::{CombinedResult, PageParseResult};
use crate::parser::{clamp_page_count, PageParser, ParseContext};
use crate::scrapers::traits::PageRenderer;
use crate::scrapers::types::{RenderRequest, SearchParameters, WaitCondition};

/// Settings for one multi-page session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on pages scraped, whatever the pagination advertises
    pub max_pages: u32,
    /// Pause before every page fetch after the first
    pub page_delay: Duration,
    pub navigation_timeout: Duration,
    pub scroll_to_bottom: bool,
    /// Pages fetched at once after page 1; 1 keeps the session strictly sequential
    pub concurrency: usize,
    /// Where raw page HTML is saved, if anywhere
    pub html_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            page_delay: Duration::from_millis(2000),
            navigation_timeout: Duration::from_secs(30),
            scroll_to_bottom: true,
            concurrency: 1,
            html_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    NotStarted,
    DetectingPageCount,
    FetchingPage(u32),
    ParsingPage(u32),
    Aggregating,
    Done,
}

/// Provenance and timing for one session, stored next to the results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub search_parameters: SearchParameters,
    pub renderer: String,
    pub source_urls: Vec<String>,
    pub pages_detected: u32,
    pub pages_requested: u32,
    pub pages_scraped: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub cancelled: bool,
    pub total_ads: usize,
    /// Reported only; duplicates stay in the ad list
    pub duplicate_ad_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub result: CombinedResult,
    pub metadata: SessionMetadata,
    pub transitions: Vec<SessionState>,
}

#[derive(Debug)]
struct StateTrace {
    states: Mutex<Vec<SessionState>>,
}

impl StateTrace {
    fn new() -> Self {
        Self {
            states: Mutex::new(vec![SessionState::NotStarted]),
        }
    }

    fn enter(&self, state: SessionState) {
        debug!(?state, "session state");
        if let Ok(mut states) = self.states.lock() {
            states.push(state);
        }
    }

    fn into_inner(self) -> Vec<SessionState> {
        self.states.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Hands out request start times at least `delay` apart, however many pages
/// are in flight.
#[derive(Debug)]
struct Pacer {
    delay: Duration,
    next: Mutex<Instant>,
}

impl Pacer {
    fn new(delay: Duration, last_request: Instant) -> Self {
        Self {
            delay,
            next: Mutex::new(last_request + delay),
        }
    }

    fn reserve(&self, now: Instant) -> Instant {
        let mut next = self.next.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let start = (*next).max(now);
        *next = start + self.delay;
        start
    }
}

/// Drives a renderer and a page parser across all result pages of one search
pub struct MultiPageAggregator {
    parser: PageParser,
    config: SessionConfig,
}

impl MultiPageAggregator {
    pub fn new(parser: PageParser, config: SessionConfig) -> Self {
        Self { parser, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run one session. Page failures are recorded in the result, never returned.
    pub async fn run(
        &self,
        renderer: &dyn PageRenderer,
        params: &SearchParameters,
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let started = Instant::now();
        let started_at = Utc::now();
        let trace = StateTrace::new();

        info!(
            keywords = %params.keywords,
            renderer = renderer.name(),
            "🔎 Starting search session"
        );

        let mut pages: Vec<PageParseResult> = Vec::new();
        let mut source_urls: Vec<String> = Vec::new();
        let mut pages_detected = 0;
        let mut pages_requested = 0;

        if !cancel.is_cancelled() {
            trace.enter(SessionState::DetectingPageCount);
            let url = self.page_url(params, 1);
            source_urls.push(url.clone());

            trace.enter(SessionState::FetchingPage(1));
            let fetched = self.fetch(renderer, &url).await;

            trace.enter(SessionState::ParsingPage(1));
            pages_detected = match &fetched {
                Ok(html) => self.parser.detect_page_count(html),
                Err(_) => 1,
            };
            pages_requested = clamp_page_count(pages_detected, self.config.max_pages);
            info!(pages_detected, pages_requested, "detected result pages");

            pages.push(self.parse_fetched(1, &url, fetched, started_at).await);
        }

        let remaining: Vec<(u32, String)> = (2..=pages_requested)
            .map(|page| (page, self.page_url(params, page)))
            .collect();
        source_urls.extend(remaining.iter().map(|(_, url)| url.clone()));

        let pacer = Pacer::new(self.config.page_delay, Instant::now());

        let rest: Vec<PageParseResult> = stream::iter(remaining)
            .map(|(page, url)| {
                self.scrape_page(renderer, page, url, started_at, &pacer, cancel, &trace)
            })
            .buffered(self.config.concurrency.max(1))
            .filter_map(|page| async move { page })
            .collect()
            .await;
        pages.extend(rest);

        trace.enter(SessionState::Aggregating);
        let pages_scraped = pages.iter().filter(|page| page.success).count();
        let result = CombinedResult::from_pages(pages);
        trace.enter(SessionState::Done);

        let cancelled = cancel.is_cancelled();
        if cancelled {
            warn!("session cancelled, keeping pages scraped so far");
        }

        let metadata = SessionMetadata {
            search_parameters: params.clone(),
            renderer: renderer.name().to_string(),
            source_urls,
            pages_detected,
            pages_requested,
            pages_scraped,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            cancelled,
            total_ads: result.ads.len(),
            duplicate_ad_ids: result.duplicate_ad_ids(),
        };

        info!(
            ads = metadata.total_ads,
            pages = metadata.pages_scraped,
            failed_pages = result.stats.pages_failed,
            "✅ Session finished"
        );

        SessionOutcome {
            result,
            metadata,
            transitions: trace.into_inner(),
        }
    }

    /// One page after the first; `None` when the session was cancelled first.
    async fn scrape_page(
        &self,
        renderer: &dyn PageRenderer,
        page: u32,
        url: String,
        captured_at: DateTime<Utc>,
        pacer: &Pacer,
        cancel: &CancellationToken,
        trace: &StateTrace,
    ) -> Option<PageParseResult> {
        if cancel.is_cancelled() {
            return None;
        }

        tokio::select! {
            _ = tokio::time::sleep_until(pacer.reserve(Instant::now()).into()) => {}
            _ = cancel.cancelled() => {
                debug!(page, "cancelled before fetch");
                return None;
            }
        }

        trace.enter(SessionState::FetchingPage(page));
        let fetched = self.fetch(renderer, &url).await;

        trace.enter(SessionState::ParsingPage(page));
        Some(self.parse_fetched(page, &url, fetched, captured_at).await)
    }

    fn page_url(&self, params: &SearchParameters, page: u32) -> String {
        params
            .search_url(&self.parser.options().base_url, page)
            .map(String::from)
            .unwrap_or_else(|e| {
                warn!(page, "failed to build search URL: {e}");
                String::new()
            })
    }

    fn render_request(&self, url: &str) -> RenderRequest {
        RenderRequest {
            url: url.to_string(),
            wait: WaitCondition::Selector(self.parser.selectors().container.primary().to_string()),
            scroll_to_bottom: self.config.scroll_to_bottom,
            timeout: self.config.navigation_timeout,
        }
    }

    async fn fetch(&self, renderer: &dyn PageRenderer, url: &str) -> Result<String, RendererError> {
        if url.is_empty() {
            return Err(RendererError::Navigation {
                url: String::new(),
                message: "no search URL".to_string(),
            });
        }
        info!(url, "📄 Fetching page");
        renderer.fetch_page(&self.render_request(url)).await
    }

    async fn parse_fetched(
        &self,
        page: u32,
        url: &str,
        fetched: Result<String, RendererError>,
        captured_at: DateTime<Utc>,
    ) -> PageParseResult {
        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                warn!(page, "page fetch failed: {e}");
                return PageParseResult::unreadable(
                    page,
                    url,
                    format!("renderer error: {e}"),
                    0,
                    0.0,
                );
            }
        };

        // One capture instant per session keeps equal relative times equal across pages
        let context = ParseContext::new(page, url).captured_at(captured_at);
        let mut result = self.parser.parse_with_context(&html, &context);

        if let Some(dir) = &self.config.html_dir {
            let path = dir.join(format!("page_{page}.html"));
            match tokio::fs::write(&path, &html).await {
                Ok(()) => result.source = path.display().to_string(),
                Err(e) => warn!(page, path = %path.display(), "failed to save page HTML: {e}"),
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacer_spaces_concurrent_reservations() {
        let start = Instant::now();
        let pacer = Pacer::new(Duration::from_millis(100), start);

        let slots: Vec<_> = (0..3).map(|_| pacer.reserve(start)).collect();
        assert_eq!(
            slots,
            vec![
                start + Duration::from_millis(100),
                start + Duration::from_millis(200),
                start + Duration::from_millis(300),
            ]
        );
    }

    #[test]
    fn pacer_starts_late_callers_immediately() {
        let start = Instant::now();
        let pacer = Pacer::new(Duration::from_millis(100), start);

        let late = start + Duration::from_secs(5);
        assert_eq!(pacer.reserve(late), late);
        assert_eq!(pacer.reserve(late), late + Duration::from_millis(100));
    }

    #[test]
    fn zero_delay_never_waits() {
        let start = Instant::now();
        let pacer = Pacer::new(Duration::ZERO, start);
        assert_eq!(pacer.reserve(start), start);
        assert_eq!(pacer.reserve(start), start);
    }
}
