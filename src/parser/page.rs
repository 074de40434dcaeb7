use std::time::Instant;

use scraper::Html;
use tracing::{debug, info, warn};

use super::builder::{
    build_ad, BuildOutcome, ExtractorOptions, ParseContext, RawAdFields, BASE_URL,
};
use super::pagination::detect_page_count;
use super::selectors::{CompiledSelectors, SelectorConfig};
use crate::error::SelectorError;
use crate::models::{
    PageParseResult, PageStats, ParseError, ParseIssue, ParseWarning, ParsedAdResult, WarningKind,
};

/// Parses search-result pages into ad records
#[derive(Debug, Clone)]
pub struct PageParser {
    selectors: CompiledSelectors,
    options: ExtractorOptions,
}

impl PageParser {
    /// Create a parser with the built-in selectors and base URL
    pub fn new() -> Result<Self, SelectorError> {
        Ok(Self::with_config(
            SelectorConfig::default().compile()?,
            ExtractorOptions::new(BASE_URL)?,
        ))
    }

    pub fn with_config(selectors: CompiledSelectors, options: ExtractorOptions) -> Self {
        Self { selectors, options }
    }

    pub fn selectors(&self) -> &CompiledSelectors {
        &self.selectors
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Parse a page as page 1 with no source URL.
    pub fn parse(&self, html: &str) -> PageParseResult {
        self.parse_with_context(html, &ParseContext::default())
    }

    /// Parse one page. Never fails: unreadable input yields an empty, unsuccessful result.
    pub fn parse_with_context(&self, html: &str, context: &ParseContext) -> PageParseResult {
        let started = Instant::now();
        let html_size_kb = size_kb(html);
        let page_number = context.page_number;

        if html.trim().is_empty() {
            warn!(page_number, "page HTML is empty");
            return PageParseResult::unreadable(
                page_number,
                context.source_url.clone(),
                "page HTML is empty",
                elapsed_ms(started),
                html_size_kb,
            );
        }

        let document = Html::parse_document(html);
        if !document.errors.is_empty() {
            debug!(page_number, count = document.errors.len(), "HTML parse errors tolerated");
        }

        let mut ads: Vec<ParsedAdResult> = Vec::new();
        let mut errors: Vec<ParseError> = Vec::new();
        let mut warnings: Vec<ParseWarning> = Vec::new();

        let containers = match self.selectors.container.select_all(document.root_element()) {
            Some(matched) => {
                if matched.fallback {
                    warnings.push(
                        ParseIssue::new(
                            WarningKind::FallbackUsed,
                            "ad containers found through fallback selector",
                        )
                        .on_page(page_number)
                        .field("container")
                        .selector(matched.selector),
                    );
                }
                matched.value
            }
            None => {
                warnings.push(
                    ParseIssue::new(WarningKind::IncompleteData, "no ad containers found")
                        .on_page(page_number)
                        .field("container")
                        .selector(self.selectors.container.primary()),
                );
                Vec::new()
            }
        };

        debug!(page_number, containers = containers.len(), "located ad containers");

        for (index, container) in containers.iter().enumerate() {
            let raw = RawAdFields::collect(*container, index, &self.selectors);
            match build_ad(&raw, &self.selectors, &self.options, context) {
                BuildOutcome::Accepted { ad, warnings: ad_warnings } => {
                    ads.push(*ad);
                    warnings.extend(ad_warnings);
                }
                BuildOutcome::Rejected(error) => {
                    debug!(page_number, index, reason = %error.message, "skipped ad");
                    errors.push(error);
                }
                BuildOutcome::Failed(error) => {
                    warn!(page_number, index, reason = %error.message, "ad extraction failed");
                    errors.push(error);
                }
            }
        }

        let failed = errors.iter().filter(|e| e.ad_index.is_some()).count();
        let stats = PageStats {
            total_found: containers.len(),
            succeeded: ads.len(),
            failed,
            elapsed_ms: elapsed_ms(started),
            html_size_kb,
        };

        info!(
            page_number,
            found = stats.total_found,
            succeeded = stats.succeeded,
            failed = stats.failed,
            "parsed page"
        );

        PageParseResult {
            success: true,
            page_number,
            source: context.source_url.clone(),
            ads,
            errors,
            warnings,
            stats,
        }
    }

    /// Number of result pages advertised by the pagination widget, 1 when none is found.
    pub fn detect_page_count(&self, html: &str) -> u32 {
        detect_page_count(html, &self.selectors)
    }
}

fn size_kb(html: &str) -> f64 {
    (html.len() as f64 / 1024.0 * 100.0).round() / 100.0
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
