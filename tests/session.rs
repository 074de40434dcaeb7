use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use kp_scout::error::RendererError;
use kp_scout::models::ErrorKind;
use kp_scout::parser::PageParser;
use kp_scout::scrapers::{
    JsonFileSink, MultiPageAggregator, PageRenderer, RenderRequest, ResultSink, SearchParameters,
    SessionConfig, SessionState,
};
use tokio_util::sync::CancellationToken;
use url::Url;

mod common;

use common::{results_page, AdFixture};

enum MockPage {
    Html(String),
    Slow(Duration, String),
    Fail,
}

/// Serves canned HTML keyed by the `page` query parameter.
struct MockRenderer {
    pages: HashMap<u32, MockPage>,
    requested: Mutex<Vec<u32>>,
    cancel_after_first: Option<CancellationToken>,
}

impl MockRenderer {
    fn new(pages: Vec<(u32, MockPage)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            requested: Mutex::new(Vec::new()),
            cancel_after_first: None,
        }
    }

    fn requested(&self) -> Vec<u32> {
        self.requested.lock().unwrap().clone()
    }
}

fn page_of(url: &str) -> u32 {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .find(|(key, _)| key == "page")
        .and_then(|(_, value)| value.parse().ok())
        .unwrap()
}

#[async_trait]
impl PageRenderer for MockRenderer {
    async fn fetch_page(&self, request: &RenderRequest) -> Result<String, RendererError> {
        let page = page_of(&request.url);
        self.requested.lock().unwrap().push(page);

        if let Some(cancel) = &self.cancel_after_first {
            cancel.cancel();
        }

        match self.pages.get(&page) {
            Some(MockPage::Html(html)) => Ok(html.clone()),
            Some(MockPage::Slow(delay, html)) => {
                tokio::time::sleep(*delay).await;
                Ok(html.clone())
            }
            Some(MockPage::Fail) | None => Err(RendererError::Timeout {
                url: request.url.clone(),
                timeout_secs: 30,
            }),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

fn aggregator(max_pages: u32, concurrency: usize) -> MultiPageAggregator {
    let config = SessionConfig {
        max_pages,
        page_delay: Duration::ZERO,
        concurrency,
        ..SessionConfig::default()
    };
    MultiPageAggregator::new(PageParser::new().unwrap(), config)
}

fn ad(id: &str, posted: &str) -> AdFixture {
    AdFixture::new(id, &format!("Oglas {id}"), posted)
}

#[tokio::test]
async fn failed_page_does_not_abort_session() {
    let renderer = MockRenderer::new(vec![
        (1, MockPage::Html(results_page(&[ad("a1", "pre 1 dan"), ad("a2", "pre 2 dana")], 3))),
        (2, MockPage::Fail),
        (3, MockPage::Html(results_page(&[ad("c1", "pre 3 dana")], 3))),
    ]);

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;
    let result = &outcome.result;

    assert_eq!(renderer.requested(), vec![1, 2, 3]);
    assert_eq!(result.ads.len(), 3);
    assert_eq!(result.stats.succeeded, result.ads.len());
    assert_eq!(result.stats.pages_parsed, 2);
    assert_eq!(result.stats.pages_failed, 1);

    let page_errors: Vec<_> = result
        .errors
        .iter()
        .filter(|e| e.kind == ErrorKind::PageUnreadable)
        .collect();
    assert_eq!(page_errors.len(), 1);
    assert_eq!(page_errors[0].page_number, Some(2));

    let breakdown: Vec<_> = result
        .pages
        .iter()
        .map(|p| (p.page_number, p.ad_count, p.success))
        .collect();
    assert_eq!(breakdown, vec![(1, 2, true), (2, 0, false), (3, 1, true)]);

    let ids: Vec<_> = result.ads.iter().map(|a| a.ad.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2", "c1"]);
    assert_eq!(result.ads[2].page_number, 3);

    assert_eq!(outcome.metadata.pages_detected, 3);
    assert_eq!(outcome.metadata.pages_requested, 3);
    assert_eq!(outcome.metadata.pages_scraped, 2);
    assert_eq!(outcome.metadata.source_urls.len(), 3);
    assert_eq!(outcome.metadata.total_ads, 3);
    assert!(!outcome.metadata.cancelled);
}

#[tokio::test]
async fn sorted_view_is_newest_first_with_undated_last() {
    let renderer = MockRenderer::new(vec![
        (
            1,
            MockPage::Html(results_page(
                &[
                    ad("old", "pre 9 dana"),
                    ad("undated-1", "juče"),
                    ad("hour", "pre 2 sata"),
                    ad("day-1", "pre 1 dan"),
                ],
                2,
            )),
        ),
        (
            2,
            MockPage::Html(results_page(
                &[ad("undated-2", ""), ad("day-2", "pre 1 dan"), ad("minute", "pre 5 minuta")],
                2,
            )),
        ),
    ]);

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    let sorted: Vec<_> = outcome
        .result
        .sorted_by_posted_date()
        .iter()
        .map(|a| a.ad.id.clone())
        .collect();

    assert_eq!(
        sorted,
        vec!["minute", "hour", "day-1", "day-2", "old", "undated-1", "undated-2"]
    );

    // Same relative text on different pages resolves to the same instant.
    let posted = |id: &str| {
        outcome
            .result
            .ads
            .iter()
            .find(|a| a.ad.id == id)
            .and_then(|a| a.ad.metrics.posted_date)
    };
    assert!(posted("day-1").is_some());
    assert_eq!(posted("day-1"), posted("day-2"));

    // Sorting is a view; the combined list keeps page order.
    assert_eq!(outcome.result.ads[0].ad.id, "old");
}

#[tokio::test]
async fn page_count_is_clamped_to_limit() {
    let page = |id: &str| MockPage::Html(results_page(&[ad(id, "pre 1 dan")], 10));
    let renderer = MockRenderer::new((1..=10).map(|n| (n, page(&format!("p{n}")))).collect());

    let outcome = aggregator(2, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    assert_eq!(renderer.requested(), vec![1, 2]);
    assert_eq!(outcome.metadata.pages_detected, 10);
    assert_eq!(outcome.metadata.pages_requested, 2);
    assert_eq!(outcome.result.ads.len(), 2);
}

#[tokio::test]
async fn records_state_transitions() {
    let renderer = MockRenderer::new(vec![
        (1, MockPage::Html(results_page(&[ad("a", "pre 1 dan")], 2))),
        (2, MockPage::Html(results_page(&[ad("b", "pre 1 dan")], 2))),
    ]);

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    assert_eq!(
        outcome.transitions,
        vec![
            SessionState::NotStarted,
            SessionState::DetectingPageCount,
            SessionState::FetchingPage(1),
            SessionState::ParsingPage(1),
            SessionState::FetchingPage(2),
            SessionState::ParsingPage(2),
            SessionState::Aggregating,
            SessionState::Done,
        ]
    );
}

#[tokio::test]
async fn failed_first_page_yields_single_page_session() {
    let renderer = MockRenderer::new(vec![(1, MockPage::Fail)]);

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    assert_eq!(renderer.requested(), vec![1]);
    assert!(outcome.result.ads.is_empty());
    assert_eq!(outcome.result.errors.len(), 1);
    assert_eq!(outcome.result.errors[0].kind, ErrorKind::PageUnreadable);
    assert!(outcome.result.errors[0].message.contains("timed out"));
}

#[tokio::test]
async fn cancelled_session_stops_between_pages() {
    let cancel = CancellationToken::new();
    let mut renderer = MockRenderer::new(vec![
        (1, MockPage::Html(results_page(&[ad("a", "pre 1 dan")], 3))),
        (2, MockPage::Html(results_page(&[ad("b", "pre 1 dan")], 3))),
        (3, MockPage::Html(results_page(&[ad("c", "pre 1 dan")], 3))),
    ]);
    renderer.cancel_after_first = Some(cancel.clone());

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &cancel)
        .await;

    assert_eq!(renderer.requested(), vec![1]);
    assert_eq!(outcome.result.ads.len(), 1);
    assert!(outcome.metadata.cancelled);
    assert!(outcome.result.errors.is_empty());
}

#[tokio::test]
async fn cancelled_before_start_fetches_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let renderer = MockRenderer::new(vec![]);

    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &cancel)
        .await;

    assert!(renderer.requested().is_empty());
    assert!(outcome.result.pages.is_empty());
    assert!(outcome.metadata.cancelled);
}

#[tokio::test]
async fn concurrent_pages_keep_page_order() {
    let renderer = MockRenderer::new(vec![
        (1, MockPage::Html(results_page(&[ad("p1", "pre 1 dan")], 4))),
        (
            2,
            MockPage::Slow(
                Duration::from_millis(80),
                results_page(&[ad("p2", "pre 1 dan")], 4),
            ),
        ),
        (
            3,
            MockPage::Slow(
                Duration::from_millis(40),
                results_page(&[ad("p3", "pre 1 dan")], 4),
            ),
        ),
        (4, MockPage::Html(results_page(&[ad("p4", "pre 1 dan")], 4))),
    ]);

    let outcome = aggregator(5, 3)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    let pages: Vec<_> = outcome.result.pages.iter().map(|p| p.page_number).collect();
    assert_eq!(pages, vec![1, 2, 3, 4]);
    let ids: Vec<_> = outcome.result.ads.iter().map(|a| a.ad.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
}

#[tokio::test]
async fn concurrent_pages_are_still_spaced_by_delay() {
    let page = |id: &str| MockPage::Html(results_page(&[ad(id, "pre 1 dan")], 4));
    let renderer = MockRenderer::new((1..=4).map(|n| (n, page(&format!("p{n}")))).collect());

    let config = SessionConfig {
        max_pages: 4,
        page_delay: Duration::from_millis(40),
        concurrency: 3,
        ..SessionConfig::default()
    };
    let outcome = MultiPageAggregator::new(PageParser::new().unwrap(), config)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    // Pages 2..=4 start 40ms apart even though all three are in flight.
    assert_eq!(renderer.requested().len(), 4);
    assert!(outcome.metadata.elapsed_ms >= 120, "{}", outcome.metadata.elapsed_ms);
}

#[tokio::test]
async fn json_sink_writes_sorted_report() -> anyhow::Result<()> {
    let renderer = MockRenderer::new(vec![(
        1,
        MockPage::Html(results_page(
            &[ad("older", "pre 4 dana"), ad("newer", "pre 1 dan")],
            1,
        )),
    )]);
    let outcome = aggregator(5, 1)
        .run(&renderer, &SearchParameters::new("ps5"), &CancellationToken::new())
        .await;

    let dir = tempfile::tempdir()?;
    let sink = JsonFileSink::new(dir.path());
    let path = sink.persist(&outcome.result, &outcome.metadata).await?;

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    assert_eq!(report["ads"][0]["ad"]["id"], "newer");
    assert_eq!(report["ads"][1]["ad"]["id"], "older");
    assert_eq!(report["metadata"]["searchParameters"]["keywords"], "ps5");
    assert_eq!(report["metadata"]["totalAds"], 2);
    assert_eq!(report["stats"]["succeeded"], 2);
    assert_eq!(report["pages"][0]["pageNumber"], 1);
    Ok(())
}
