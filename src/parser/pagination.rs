use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use tracing::debug;

use super::selectors::CompiledSelectors;

/// Page numbers above this are treated as unrelated numbers on the page.
pub const MAX_PLAUSIBLE_PAGES: u32 = 500;

static PAGE_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]page=(\d+)").expect("page parameter pattern is valid"));

// Grouped thousands ("4.512") stay one token so they are not read as 4 and 512.
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d{3})*").expect("number pattern is valid"));

fn plausible(token: &str) -> Option<u32> {
    token
        .replace('.', "")
        .parse::<u32>()
        .ok()
        .filter(|page| (1..=MAX_PLAUSIBLE_PAGES).contains(page))
}

/// Highest page index referenced by pagination links or the pagination summary.
pub fn detect_page_count(html: &str, selectors: &CompiledSelectors) -> u32 {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let from_links = selectors
        .pagination_link
        .select_all(root)
        .map(|matched| matched.value)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| PAGE_PARAM_RE.captures(href))
        .filter_map(|caps| plausible(&caps[1]))
        .max();

    let from_summary = selectors
        .pagination_summary
        .select_all(root)
        .map(|matched| matched.value)
        .unwrap_or_default()
        .into_iter()
        .flat_map(|element| {
            // Separate text nodes so adjacent labels like "1" "2" "3" never read as 123
            let text = element.text().collect::<Vec<_>>().join(" ");
            NUMBER_RE
                .find_iter(&text)
                .filter_map(|m| plausible(m.as_str()))
                .collect::<Vec<_>>()
        })
        .max();

    let detected = from_links.max(from_summary).unwrap_or(1);
    debug!(?from_links, ?from_summary, detected, "detected page count");
    detected
}

/// Clamps a detected page count to the caller's limit; at least one page is always scraped.
pub fn clamp_page_count(detected: u32, max_pages: u32) -> u32 {
    detected.min(max_pages).max(1)
}
