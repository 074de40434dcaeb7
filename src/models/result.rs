use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AdRecord;

/// Error categories recorded while parsing a page
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Expected element absent
    MissingSelector,
    /// Element present but its content failed validation
    InvalidData,
    /// Unexpected failure while processing one ad
    ExtractionFailed,
    /// The whole page could not be read
    PageUnreadable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    FallbackUsed,
    IncompleteData,
    SuspiciousValue,
}

/// A structured error or warning with enough context to diagnose a layout change
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseIssue<K> {
    pub kind: K,
    pub page_number: Option<u32>,
    pub ad_index: Option<usize>,
    pub field: Option<String>,
    pub selector: Option<String>,
    pub message: String,
}

pub type ParseError = ParseIssue<ErrorKind>;
pub type ParseWarning = ParseIssue<WarningKind>;

impl<K> ParseIssue<K> {
    pub fn new(kind: K, message: impl Into<String>) -> Self {
        Self {
            kind,
            page_number: None,
            ad_index: None,
            field: None,
            selector: None,
            message: message.into(),
        }
    }

    pub fn at_ad(mut self, ad_index: usize) -> Self {
        self.ad_index = Some(ad_index);
        self
    }

    pub fn on_page(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }

    pub fn field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn selector(mut self, selector: &str) -> Self {
        self.selector = Some(selector.to_string());
        self
    }
}

/// Values derived from an [`AdRecord`] for filtering and sorting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedFields {
    pub price_numeric: f64,
    /// Only counts "pre N dana"; hour and minute postings report 0
    pub posted_days_ago: u32,
    pub image_urls: Vec<String>,
    /// True only when the record passed all required-field checks
    pub is_valid_ad: bool,
}

/// An accepted ad together with its derived fields and provenance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAdResult {
    pub ad: AdRecord,
    pub parsed: DerivedFields,
    pub scraped_at: DateTime<Utc>,
    pub source_url: String,
    pub page_number: u32,
    pub index_on_page: usize,
    pub parsing_success: bool,
    pub errors: Vec<String>,
}

impl ParsedAdResult {
    pub fn posted_date(&self) -> Option<DateTime<Utc>> {
        self.ad.metrics.posted_date
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub total_found: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub html_size_kb: f64,
}

/// Outcome of parsing one search-result page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageParseResult {
    pub success: bool,
    pub page_number: u32,
    /// Page URL or the path of the saved HTML artifact
    pub source: String,
    pub ads: Vec<ParsedAdResult>,
    pub errors: Vec<ParseError>,
    pub warnings: Vec<ParseWarning>,
    pub stats: PageStats,
}

impl PageParseResult {
    /// Result for a page whose HTML could not be obtained or read at all.
    pub fn unreadable(
        page_number: u32,
        source: impl Into<String>,
        message: impl Into<String>,
        elapsed_ms: u64,
        html_size_kb: f64,
    ) -> Self {
        Self {
            success: false,
            page_number,
            source: source.into(),
            ads: Vec::new(),
            errors: vec![ParseIssue::new(ErrorKind::PageUnreadable, message).on_page(page_number)],
            warnings: Vec::new(),
            stats: PageStats {
                total_found: 0,
                succeeded: 0,
                failed: 0,
                elapsed_ms,
                html_size_kb,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageBreakdown {
    pub page_number: u32,
    pub ad_count: usize,
    pub source: String,
    pub success: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombinedStats {
    pub total_found: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u64,
    pub html_size_kb: f64,
    pub pages_parsed: usize,
    pub pages_failed: usize,
}

/// Merge of all pages parsed in one session, ads kept in page order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResult {
    pub ads: Vec<ParsedAdResult>,
    pub errors: Vec<ParseError>,
    pub warnings: Vec<ParseWarning>,
    pub stats: CombinedStats,
    pub pages: Vec<PageBreakdown>,
}

impl CombinedResult {
    /// Concatenates page results in the order given.
    pub fn from_pages(pages: Vec<PageParseResult>) -> Self {
        let mut combined = Self::default();

        for page in pages {
            combined.stats.total_found += page.stats.total_found;
            combined.stats.succeeded += page.stats.succeeded;
            combined.stats.failed += page.stats.failed;
            combined.stats.elapsed_ms += page.stats.elapsed_ms;
            combined.stats.html_size_kb += page.stats.html_size_kb;
            if page.success {
                combined.stats.pages_parsed += 1;
            } else {
                combined.stats.pages_failed += 1;
            }

            combined.pages.push(PageBreakdown {
                page_number: page.page_number,
                ad_count: page.ads.len(),
                source: page.source,
                success: page.success,
            });
            combined.ads.extend(page.ads);
            combined.errors.extend(page.errors);
            combined.warnings.extend(page.warnings);
        }

        combined
    }

    /// Newest first; see [`sort_by_posted_date`].
    pub fn sorted_by_posted_date(&self) -> Vec<&ParsedAdResult> {
        sort_by_posted_date(&self.ads)
    }

    /// Ad ids seen on more than one container, in first-seen order.
    pub fn duplicate_ad_ids(&self) -> Vec<String> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut duplicates = Vec::new();
        for ad in &self.ads {
            let count = seen.entry(ad.ad.id.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                duplicates.push(ad.ad.id.clone());
            }
        }
        duplicates
    }
}

/// Descending by posted date; undated ads sink to the end and ties keep input order.
pub fn sort_by_posted_date(ads: &[ParsedAdResult]) -> Vec<&ParsedAdResult> {
    let mut view: Vec<&ParsedAdResult> = ads.iter().collect();
    // `None < Some(_)`, so reversing the comparison puts undated ads last.
    // `sort_by` is stable.
    view.sort_by(|a, b| b.posted_date().cmp(&a.posted_date()));
    view
}
