use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod result;

pub use result::{
    sort_by_posted_date, CombinedResult, CombinedStats, DerivedFields, ErrorKind, PageBreakdown,
    PageParseResult, PageStats, ParseError, ParseIssue, ParseWarning, ParsedAdResult,
    WarningKind,
};

/// Price as displayed on the listing plus its parsed amount
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Parsed amount, 0 when the display text held no recognizable number
    pub amount: f64,
    /// "RSD", "EUR", "USD" or a bare symbol ("$", "€")
    pub currency: String,
    /// Whitespace-normalized display text, kept even when parsing failed
    pub formatted: String,
}

/// Location information for a listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub has_delivery: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub url: String,
    pub alt_text: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Seller storefront information
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub has_storefront: bool,
    pub store_url: Option<String>,
    pub store_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub views: u64,
    pub favorites: u64,
    pub posted_ago_text: String,
    /// Capture time minus the relative offset; `None` means unknown, not "just posted"
    pub posted_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub is_active: bool,
    pub is_promoted: bool,
}

/// Raw container identifiers, kept for provenance only
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub container_id: Option<String>,
    pub class_list: Vec<String>,
    pub category_id: Option<String>,
    pub subcategory_id: Option<String>,
}

/// One marketplace listing extracted from an ad container
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: Price,
    pub location: Location,
    pub description: String,
    pub images: Vec<Image>,
    pub seller: Seller,
    pub metrics: Metrics,
    pub status: Status,
    pub source_metadata: SourceMetadata,
}
