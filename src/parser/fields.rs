//! Field extractors
//!
//! Pure functions turning a text fragment, already isolated from its ad
//! container, into a typed value. Malformed input never fails: it degrades
//! to the documented default and reports `complete = false` so the caller
//! can decide whether to warn.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Location, Price, Seller};

/// Currency assumed when the price text carries no recognizable token.
pub const DEFAULT_CURRENCY: &str = "RSD";

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d.,]*)\s*(din|rsd|eur|usd|\$|€)").expect("price pattern is valid")
});

static RELATIVE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bpre\s+(\d+)\s+(dana|dan|sata|sati|sat|minuta|minut|min)\b")
        .expect("relative time pattern is valid")
});

/// A value produced by an extractor together with whether the input parsed fully.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub complete: bool,
}

impl<T> Extracted<T> {
    fn complete(value: T) -> Self {
        Self {
            value,
            complete: true,
        }
    }

    fn partial(value: T) -> Self {
        Self {
            value,
            complete: false,
        }
    }
}

/// Collapses every run of whitespace (including NBSP) into one space and trims.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parses "12.500 din", "1.250,50 €", "300 EUR" and the like.
///
/// Numbers follow the local convention: `.` groups thousands and `,` marks
/// decimals. `formatted` always holds the whitespace-normalized input.
pub fn extract_price(text: &str) -> Extracted<Price> {
    let formatted = normalize_whitespace(text);

    let Some(caps) = PRICE_RE.captures(&formatted) else {
        return Extracted::partial(Price {
            amount: 0.0,
            currency: DEFAULT_CURRENCY.to_string(),
            formatted,
        });
    };

    let currency = normalize_currency(&caps[2]);
    let amount = parse_local_number(&caps[1]);
    let complete = amount.is_some();

    let price = Price {
        amount: amount.unwrap_or(0.0),
        currency,
        formatted,
    };

    if complete {
        Extracted::complete(price)
    } else {
        Extracted::partial(price)
    }
}

fn normalize_currency(token: &str) -> String {
    if token.eq_ignore_ascii_case("din") {
        DEFAULT_CURRENCY.to_string()
    } else {
        token.to_uppercase()
    }
}

fn parse_local_number(token: &str) -> Option<f64> {
    let normalized = token.replace('.', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

/// Delivery detection is not derived from the text; the caller supplies the flag.
pub fn extract_location(text: &str, has_delivery: bool) -> Location {
    Location {
        name: normalize_whitespace(text),
        has_delivery,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Hour,
    Minute,
}

impl TimeUnit {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "dan" | "dana" => Some(Self::Day),
            "sat" | "sata" | "sati" => Some(Self::Hour),
            "min" | "minut" | "minuta" => Some(Self::Minute),
            _ => None,
        }
    }

    fn duration(self, amount: u32) -> Option<Duration> {
        let amount = i64::from(amount);
        match self {
            Self::Day => Duration::try_days(amount),
            Self::Hour => Duration::try_hours(amount),
            Self::Minute => Duration::try_minutes(amount),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime {
    pub amount: u32,
    pub unit: TimeUnit,
}

/// Recognizes "pre N dana", "pre N sati", "pre N minuta" and their singular forms.
pub fn parse_relative_time(text: &str) -> Option<RelativeTime> {
    let caps = RELATIVE_TIME_RE.captures(text)?;
    let amount = caps[1].parse::<u32>().ok()?;
    let unit = TimeUnit::from_token(&caps[2])?;
    Some(RelativeTime { amount, unit })
}

/// Absolute posting time relative to `captured_at`. `None` means unknown.
pub fn extract_posted_date(text: &str, captured_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let relative = parse_relative_time(text)?;
    let offset = relative.unit.duration(relative.amount)?;
    captured_at.checked_sub_signed(offset)
}

/// Whole days since posting. Only the day unit counts: "pre 5 sati" is 0.
pub fn extract_days_ago(text: &str) -> u32 {
    match parse_relative_time(text) {
        Some(RelativeTime {
            amount,
            unit: TimeUnit::Day,
        }) => amount,
        _ => 0,
    }
}

/// Storefront link found inside an ad container.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreLink {
    pub url: String,
    pub text: String,
}

pub fn extract_seller(link: Option<&StoreLink>) -> Seller {
    let Some(link) = link else {
        return Seller::default();
    };

    let store_id: String = link.text.chars().filter(|c| c.is_alphanumeric()).collect();

    Seller {
        has_storefront: true,
        store_url: Some(link.url.clone()).filter(|url| !url.is_empty()),
        store_id: Some(store_id).filter(|id| !id.is_empty()),
    }
}

/// Parses one counter widget ("1.234", "56 ") into an integer.
pub fn extract_count(text: &str) -> Extracted<u64> {
    let digits: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != ',')
        .collect();

    match digits.parse::<u64>() {
        Ok(count) => Extracted::complete(count),
        Err(_) => Extracted::partial(0),
    }
}

/// Views and favorites from the container's counter widgets.
///
/// Positional: the first widget is views, the second favorites. Nothing
/// checks the widget labels, so a layout change that reorders them will
/// swap the values.
pub fn extract_counters(widgets: &[String]) -> Extracted<(u64, u64)> {
    let views = widgets.first().map(|text| extract_count(text));
    let favorites = widgets.get(1).map(|text| extract_count(text));

    let complete = matches!((&views, &favorites), (Some(v), Some(f)) if v.complete && f.complete);
    let value = (
        views.map_or(0, |v| v.value),
        favorites.map_or(0, |f| f.value),
    );

    Extracted { value, complete }
}
