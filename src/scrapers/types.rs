use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const SEARCH_PATH: &str = "/pretraga";

/// Search parameters for one scraping session
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    /// Free-text search terms
    pub keywords: String,
    pub category_id: Option<String>,
    pub group_id: Option<String>,
    /// Only listings with a stated price
    pub has_price: Option<bool>,
    /// Sort order understood by the site, e.g. "posted desc"
    pub order: Option<String>,
    pub location: Option<String>,
    /// Minimum price (RSD)
    pub min_price: Option<u64>,
    /// Maximum price (RSD)
    pub max_price: Option<u64>,
}

impl SearchParameters {
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Self::default()
        }
    }

    /// Search URL for one result page (1-based).
    pub fn search_url(&self, base_url: &Url, page: u32) -> Result<Url, url::ParseError> {
        let mut url = base_url.join(SEARCH_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("keywords", &self.keywords);
            if let Some(category_id) = &self.category_id {
                query.append_pair("categoryId", category_id);
            }
            if let Some(group_id) = &self.group_id {
                query.append_pair("groupId", group_id);
            }
            if let Some(has_price) = self.has_price {
                query.append_pair("hasPrice", if has_price { "yes" } else { "no" });
            }
            if let Some(order) = &self.order {
                query.append_pair("order", order);
            }
            if let Some(location) = &self.location {
                query.append_pair("location", location);
            }
            if let Some(min_price) = self.min_price {
                query.append_pair("minPrice", &min_price.to_string());
            }
            if let Some(max_price) = self.max_price {
                query.append_pair("maxPrice", &max_price.to_string());
            }
            query.append_pair("ignoreUserId", "no");
            query.append_pair("page", &page.to_string());
        }
        Ok(url)
    }
}

/// What the renderer waits for before returning the page HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaitCondition {
    /// Navigation finished
    Load,
    /// An element matching the CSS selector is present
    Selector(String),
    /// A fixed pause after navigation
    Delay(Duration),
}

/// One page render request handed to a [`PageRenderer`](super::PageRenderer)
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    pub url: String,
    pub wait: WaitCondition,
    pub scroll_to_bottom: bool,
    pub timeout: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::BASE_URL;

    fn base() -> Url {
        Url::parse(BASE_URL).unwrap()
    }

    #[test]
    fn minimal_search_url() {
        let url = SearchParameters::new("ps5").search_url(&base(), 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.kupujemprodajem.com/pretraga?keywords=ps5&ignoreUserId=no&page=1"
        );
    }

    #[test]
    fn full_search_url_is_encoded() {
        let params = SearchParameters {
            keywords: "sony ps5 disk".to_string(),
            category_id: Some("1221".to_string()),
            group_id: Some("4".to_string()),
            has_price: Some(true),
            order: Some("posted desc".to_string()),
            location: Some("Novi Sad".to_string()),
            min_price: Some(10_000),
            max_price: Some(60_000),
        };
        let url = params.search_url(&base(), 3).unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("keywords".to_string(), "sony ps5 disk".to_string()));
        assert!(url.as_str().contains("keywords=sony+ps5+disk"));
        assert!(pairs.contains(&("hasPrice".to_string(), "yes".to_string())));
        assert!(pairs.contains(&("location".to_string(), "Novi Sad".to_string())));
        assert!(pairs.contains(&("maxPrice".to_string(), "60000".to_string())));
        assert_eq!(pairs.last().unwrap(), &("page".to_string(), "3".to_string()));
    }
}
