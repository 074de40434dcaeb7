//! Ad record builder
//!
//! Lifts the raw text and attributes out of one ad container into a
//! [`RawAdFields`] bag, then validates the bag into an [`AdRecord`].

use chrono::{DateTime, Utc};
use scraper::ElementRef;
use tracing::debug;
use url::Url;

use super::fields::{
    extract_counters, extract_days_ago, extract_location, extract_posted_date, extract_price,
    extract_seller, normalize_whitespace, StoreLink,
};
use super::selectors::{CompiledSelectors, FieldSelectors, Matched};
use crate::error::SelectorError;
use crate::models::{
    AdRecord, DerivedFields, ErrorKind, Image, Metrics, ParseError, ParseIssue, ParseWarning,
    ParsedAdResult, SourceMetadata, Status, WarningKind,
};

pub const BASE_URL: &str = "https://www.kupujemprodajem.com";

const CATEGORY_ATTR: &str = "data-category-id";
const SUBCATEGORY_ATTR: &str = "data-group-id";

/// Options applied to every ad while building records
#[derive(Debug, Clone)]
pub struct ExtractorOptions {
    /// Relative hrefs are joined against this
    pub base_url: Url,
    /// Value of `Location::has_delivery`; nothing on the page sets it yet
    pub default_has_delivery: bool,
}

impl ExtractorOptions {
    pub fn new(base_url: &str) -> Result<Self, SelectorError> {
        let base_url = Url::parse(base_url).map_err(|e| SelectorError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url,
            default_has_delivery: false,
        })
    }

    pub fn with_delivery(mut self, has_delivery: bool) -> Self {
        self.default_has_delivery = has_delivery;
        self
    }
}

/// Where an ad was captured, stamped onto every record built from a page
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub page_number: u32,
    pub source_url: String,
    pub captured_at: DateTime<Utc>,
}

impl ParseContext {
    pub fn new(page_number: u32, source_url: impl Into<String>) -> Self {
        Self {
            page_number,
            source_url: source_url.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn captured_at(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = captured_at;
        self
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new(1, String::new())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    pub src: String,
    pub alt: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawStoreLink {
    pub href: String,
    pub text: String,
}

/// A field that was read through a fallback selector
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackNote {
    pub field: &'static str,
    pub selector: String,
}

/// Text and attributes lifted from one ad container, not yet validated.
///
/// `None` means the element was absent; `Some("")` means it was present but empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAdFields {
    pub index: usize,
    pub container_id: Option<String>,
    pub class_list: Vec<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
    pub href: Option<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub posted: Option<String>,
    pub images: Vec<RawImage>,
    pub store_link: Option<RawStoreLink>,
    pub counters: Vec<String>,
    pub promoted_badge: bool,
    pub fallbacks: Vec<FallbackNote>,
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

impl RawAdFields {
    pub fn collect(container: ElementRef<'_>, index: usize, selectors: &CompiledSelectors) -> Self {
        let node = container.value();
        let mut raw = Self {
            index,
            container_id: node.id().map(str::to_string),
            class_list: node.classes().map(str::to_string).collect(),
            category_id: node.attr(CATEGORY_ATTR).map(str::to_string),
            subcategory_id: node.attr(SUBCATEGORY_ATTR).map(str::to_string),
            ..Self::default()
        };

        raw.href = raw
            .first(container, &selectors.link)
            .and_then(|link| link.value().attr("href").map(str::to_string));
        raw.title = raw.first(container, &selectors.title).map(element_text);
        raw.price = raw.first(container, &selectors.price).map(element_text);
        raw.location = raw.first(container, &selectors.location).map(element_text);
        raw.description = raw
            .first(container, &selectors.description)
            .map(element_text);
        raw.posted = raw.first(container, &selectors.posted).map(element_text);

        raw.images = raw
            .all(container, &selectors.image)
            .into_iter()
            .filter_map(|img| {
                let node = img.value();
                let src = node.attr("src").or_else(|| node.attr("data-src"))?;
                Some(RawImage {
                    src: src.to_string(),
                    alt: node.attr("alt").unwrap_or_default().to_string(),
                    width: node.attr("width").and_then(|w| w.trim().parse().ok()),
                    height: node.attr("height").and_then(|h| h.trim().parse().ok()),
                })
            })
            .collect();

        raw.store_link = raw.first(container, &selectors.store_link).map(|link| {
            RawStoreLink {
                href: link.value().attr("href").unwrap_or_default().to_string(),
                text: element_text(link),
            }
        });

        raw.counters = raw
            .all(container, &selectors.counter)
            .into_iter()
            .map(element_text)
            .collect();

        raw.promoted_badge = selectors.promoted_badge.select_first(container).is_some();

        raw
    }

    fn note<'s, T>(&mut self, field: &'static str, matched: Matched<'s, T>) -> T {
        if matched.fallback {
            self.fallbacks.push(FallbackNote {
                field,
                selector: matched.selector.to_string(),
            });
        }
        matched.value
    }

    fn first<'a>(
        &mut self,
        container: ElementRef<'a>,
        selectors: &FieldSelectors,
    ) -> Option<ElementRef<'a>> {
        let matched = selectors.select_first(container)?;
        Some(self.note(selectors.field, matched))
    }

    fn all<'a>(
        &mut self,
        container: ElementRef<'a>,
        selectors: &FieldSelectors,
    ) -> Vec<ElementRef<'a>> {
        match selectors.select_all(container) {
            Some(matched) => self.note(selectors.field, matched),
            None => Vec::new(),
        }
    }

    fn has_class_fragment(&self, fragments: &[String]) -> bool {
        self.class_list
            .iter()
            .any(|class| fragments.iter().any(|fragment| class.contains(fragment.as_str())))
    }
}

/// Outcome of building one ad
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Accepted {
        ad: Box<ParsedAdResult>,
        warnings: Vec<ParseWarning>,
    },
    /// A required field was missing or empty; no record is emitted
    Rejected(ParseError),
    /// Processing the ad failed outright
    Failed(ParseError),
}

/// Joins container-relative hrefs against `base`; absolute hrefs pass through unchanged.
pub fn resolve_url(base: &Url, href: &str) -> Result<String, url::ParseError> {
    let href = href.trim();
    if href.is_empty() {
        return Ok(String::new());
    }

    match Url::parse(href) {
        Ok(_) => Ok(href.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(base.join(href)?.to_string()),
        Err(e) => Err(e),
    }
}

fn required(
    value: Option<&str>,
    field: &'static str,
    selectors: &FieldSelectors,
    index: usize,
) -> Result<String, ParseError> {
    match value.map(normalize_whitespace) {
        Some(text) if !text.is_empty() => Ok(text),
        Some(_) => Err(ParseIssue::new(ErrorKind::InvalidData, format!("{field} is empty"))
            .at_ad(index)
            .field(field)
            .selector(selectors.primary())),
        None => Err(
            ParseIssue::new(ErrorKind::MissingSelector, format!("{field} element not found"))
                .at_ad(index)
                .field(field)
                .selector(selectors.primary()),
        ),
    }
}

/// Validates a raw field bag into a parsed ad.
///
/// Title, price text and resolved URL are required and checked in that
/// order; the first one missing rejects the ad.
pub fn build_ad(
    raw: &RawAdFields,
    selectors: &CompiledSelectors,
    options: &ExtractorOptions,
    context: &ParseContext,
) -> BuildOutcome {
    let index = raw.index;
    let on_page = |issue: ParseError| issue.on_page(context.page_number);

    let title = match required(raw.title.as_deref(), "title", &selectors.title, index) {
        Ok(title) => title,
        Err(e) => return BuildOutcome::Rejected(on_page(e)),
    };

    let price_text = match required(raw.price.as_deref(), "price", &selectors.price, index) {
        Ok(text) => text,
        Err(e) => return BuildOutcome::Rejected(on_page(e)),
    };
    let price = extract_price(&price_text);

    let href = match required(raw.href.as_deref(), "link", &selectors.link, index) {
        Ok(href) => href,
        Err(e) => return BuildOutcome::Rejected(on_page(e)),
    };
    let url = match resolve_url(&options.base_url, &href) {
        Ok(url) => url,
        Err(e) => {
            return BuildOutcome::Failed(on_page(
                ParseIssue::new(
                    ErrorKind::ExtractionFailed,
                    format!("cannot resolve href '{href}': {e}"),
                )
                .at_ad(index)
                .field("link")
                .selector(selectors.link.primary()),
            ))
        }
    };

    let mut warnings: Vec<ParseWarning> = raw
        .fallbacks
        .iter()
        .map(|note| {
            ParseIssue::new(
                WarningKind::FallbackUsed,
                format!("{} read through fallback selector", note.field),
            )
            .at_ad(index)
            .field(note.field)
            .selector(&note.selector)
        })
        .collect();

    if !price.complete {
        warnings.push(
            ParseIssue::new(
                WarningKind::SuspiciousValue,
                format!("price '{}' has no recognizable amount", price.value.formatted),
            )
            .at_ad(index)
            .field("price"),
        );
    }

    let posted_text = raw
        .posted
        .as_deref()
        .map(normalize_whitespace)
        .unwrap_or_default();
    let posted_date = extract_posted_date(&posted_text, context.captured_at);
    if posted_date.is_none() {
        warnings.push(
            ParseIssue::new(
                WarningKind::IncompleteData,
                format!("posted time '{posted_text}' not recognized"),
            )
            .at_ad(index)
            .field("posted")
            .selector(selectors.posted.primary()),
        );
    }

    let counters = extract_counters(&raw.counters);
    if !counters.complete {
        warnings.push(
            ParseIssue::new(
                WarningKind::IncompleteData,
                format!("expected 2 counter widgets, found {}", raw.counters.len()),
            )
            .at_ad(index)
            .field("counter")
            .selector(selectors.counter.primary()),
        );
    }
    let (views, favorites) = counters.value;

    let images: Vec<Image> = raw
        .images
        .iter()
        .filter_map(|image| {
            let url = resolve_url(&options.base_url, &image.src).ok()?;
            (!url.is_empty()).then(|| Image {
                url,
                alt_text: normalize_whitespace(&image.alt),
                width: image.width,
                height: image.height,
            })
        })
        .collect();

    let store_link = raw.store_link.as_ref().map(|link| StoreLink {
        url: resolve_url(&options.base_url, &link.href).unwrap_or_default(),
        text: link.text.clone(),
    });

    let id = raw
        .container_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| format!("ad-{}-{index}", context.page_number));

    let ad = AdRecord {
        id,
        title,
        url,
        location: extract_location(
            raw.location.as_deref().unwrap_or_default(),
            options.default_has_delivery,
        ),
        description: raw
            .description
            .as_deref()
            .map(normalize_whitespace)
            .unwrap_or_default(),
        images,
        seller: extract_seller(store_link.as_ref()),
        metrics: Metrics {
            views,
            favorites,
            posted_ago_text: posted_text,
            posted_date,
        },
        status: Status {
            is_active: !raw.has_class_fragment(&selectors.inactive_class_fragments),
            is_promoted: raw.promoted_badge
                || raw.has_class_fragment(&selectors.promoted_class_fragments),
        },
        source_metadata: SourceMetadata {
            container_id: raw.container_id.clone(),
            class_list: raw.class_list.clone(),
            category_id: raw.category_id.clone(),
            subcategory_id: raw.subcategory_id.clone(),
        },
        price: price.value,
    };

    let parsed = DerivedFields {
        price_numeric: ad.price.amount,
        posted_days_ago: extract_days_ago(&ad.metrics.posted_ago_text),
        image_urls: ad.images.iter().map(|image| image.url.clone()).collect(),
        is_valid_ad: true,
    };

    debug!(index, id = %ad.id, title = %ad.title, "built ad");

    let warnings = warnings
        .into_iter()
        .map(|warning| warning.on_page(context.page_number))
        .collect();

    BuildOutcome::Accepted {
        ad: Box::new(ParsedAdResult {
            ad,
            parsed,
            scraped_at: context.captured_at,
            source_url: context.source_url.clone(),
            page_number: context.page_number,
            index_on_page: index,
            parsing_success: true,
            errors: Vec::new(),
        }),
        warnings,
    }
}
