//! Selector configuration
//!
//! Every field has a primary CSS selector followed by fallbacks. The table is
//! built once at startup (defaults plus optional overrides), compiled, and
//! handed to the page parser by value.

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::SelectorError;

fn owned(selectors: &[&str]) -> Vec<String> {
    selectors.iter().map(|s| s.to_string()).collect()
}

/// CSS selectors for the search-results layout, each with ordered fallbacks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorConfig {
    pub container: Vec<String>,
    pub link: Vec<String>,
    pub title: Vec<String>,
    pub price: Vec<String>,
    pub location: Vec<String>,
    pub description: Vec<String>,
    pub posted: Vec<String>,
    pub image: Vec<String>,
    pub store_link: Vec<String>,
    /// View and favorite counters, matched positionally
    pub counter: Vec<String>,
    pub promoted_badge: Vec<String>,
    pub pagination_link: Vec<String>,
    pub pagination_summary: Vec<String>,
    /// Container class fragments marking a promoted ad
    pub promoted_class_fragments: Vec<String>,
    /// Container class fragments marking an expired or inactive ad
    pub inactive_class_fragments: Vec<String>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            container: owned(&[
                r#"section[id][class*="AdItem_adOuterHolder"]"#,
                r#"article[id][class*="AdItem"]"#,
            ]),
            link: owned(&[r#"a[href*="/oglas/"]"#, "a[href]"]),
            title: owned(&[r#"[class*="AdItem_name"]"#, r#"[class*="adName"]"#]),
            price: owned(&[r#"[class*="AdItem_price"]"#, r#"[class*="price"]"#]),
            location: owned(&[
                r#"[class*="AdItem_originAndPromoLocation"] p"#,
                r#"[class*="location"]"#,
            ]),
            description: owned(&[
                r#"[class*="AdItem_adInfoHolder"] > p"#,
                r#"p[class*="description"]"#,
            ]),
            posted: owned(&[r#"[class*="AdItem_postedStatus"]"#, "time"]),
            image: owned(&[r#"[class*="AdItem_imageHolder"] img"#, "img"]),
            store_link: owned(&[r#"a[href*="/kp-store/"]"#, r#"a[class*="StoreLink"]"#]),
            counter: owned(&[r#"[class*="AdItem_count"]"#, r#"[class*="counter"]"#]),
            promoted_badge: owned(&[r#"[class*="AdItem_promoBadge"]"#]),
            pagination_link: owned(&[r#"a[href*="page="]"#, r#"[class*="Pagination"] a"#]),
            pagination_summary: owned(&[
                r#"[class*="Pagination_summary"]"#,
                r#"[class*="paginationSummary"]"#,
            ]),
            promoted_class_fragments: owned(&["promoted", "Promoted"]),
            inactive_class_fragments: owned(&["inactive", "expired"]),
        }
    }
}

/// Partial replacement for [`SelectorConfig`]; absent fields keep the default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorOverrides {
    pub container: Option<Vec<String>>,
    pub link: Option<Vec<String>>,
    pub title: Option<Vec<String>>,
    pub price: Option<Vec<String>>,
    pub location: Option<Vec<String>>,
    pub description: Option<Vec<String>>,
    pub posted: Option<Vec<String>>,
    pub image: Option<Vec<String>>,
    pub store_link: Option<Vec<String>>,
    pub counter: Option<Vec<String>>,
    pub promoted_badge: Option<Vec<String>>,
    pub pagination_link: Option<Vec<String>>,
    pub pagination_summary: Option<Vec<String>>,
    pub promoted_class_fragments: Option<Vec<String>>,
    pub inactive_class_fragments: Option<Vec<String>>,
}

impl SelectorConfig {
    pub fn with_overrides(mut self, overrides: SelectorOverrides) -> Self {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = overrides.$field {
                    self.$field = value;
                })*
            };
        }

        apply!(
            container,
            link,
            title,
            price,
            location,
            description,
            posted,
            image,
            store_link,
            counter,
            promoted_badge,
            pagination_link,
            pagination_summary,
            promoted_class_fragments,
            inactive_class_fragments,
        );
        self
    }

    pub fn compile(&self) -> Result<CompiledSelectors, SelectorError> {
        Ok(CompiledSelectors {
            container: FieldSelectors::compile("container", &self.container)?,
            link: FieldSelectors::compile("link", &self.link)?,
            title: FieldSelectors::compile("title", &self.title)?,
            price: FieldSelectors::compile("price", &self.price)?,
            location: FieldSelectors::compile("location", &self.location)?,
            description: FieldSelectors::compile("description", &self.description)?,
            posted: FieldSelectors::compile("posted", &self.posted)?,
            image: FieldSelectors::compile("image", &self.image)?,
            store_link: FieldSelectors::compile("store_link", &self.store_link)?,
            counter: FieldSelectors::compile("counter", &self.counter)?,
            promoted_badge: FieldSelectors::compile("promoted_badge", &self.promoted_badge)?,
            pagination_link: FieldSelectors::compile("pagination_link", &self.pagination_link)?,
            pagination_summary: FieldSelectors::compile(
                "pagination_summary",
                &self.pagination_summary,
            )?,
            promoted_class_fragments: self.promoted_class_fragments.clone(),
            inactive_class_fragments: self.inactive_class_fragments.clone(),
        })
    }
}

/// Elements found by one of a field's selectors
#[derive(Debug)]
pub struct Matched<'s, T> {
    pub value: T,
    pub selector: &'s str,
    /// True when the primary selector found nothing and a fallback did
    pub fallback: bool,
}

/// Compiled selectors for one field, primary first
#[derive(Debug, Clone)]
pub struct FieldSelectors {
    pub field: &'static str,
    entries: Vec<(String, Selector)>,
}

impl FieldSelectors {
    fn compile(field: &'static str, sources: &[String]) -> Result<Self, SelectorError> {
        if sources.is_empty() {
            return Err(SelectorError::Empty { field });
        }

        let entries = sources
            .iter()
            .map(|source| {
                Selector::parse(source)
                    .map(|selector| (source.clone(), selector))
                    .map_err(|e| SelectorError::Invalid {
                        field,
                        selector: source.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { field, entries })
    }

    pub fn primary(&self) -> &str {
        self.entries
            .first()
            .map(|(source, _)| source.as_str())
            .unwrap_or_default()
    }

    /// First element under `scope` matched by the first selector that matches anything.
    pub fn select_first<'a>(&self, scope: ElementRef<'a>) -> Option<Matched<'_, ElementRef<'a>>> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(position, (source, selector))| {
                scope.select(selector).next().map(|element| Matched {
                    value: element,
                    selector: source.as_str(),
                    fallback: position > 0,
                })
            })
    }

    /// All elements under `scope` matched by the first selector that matches anything.
    pub fn select_all<'a>(
        &self,
        scope: ElementRef<'a>,
    ) -> Option<Matched<'_, Vec<ElementRef<'a>>>> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(position, (source, selector))| {
                let elements: Vec<ElementRef<'a>> = scope.select(selector).collect();
                (!elements.is_empty()).then(|| Matched {
                    value: elements,
                    selector: source.as_str(),
                    fallback: position > 0,
                })
            })
    }
}

/// Selector table ready for matching, passed into the page parser
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub container: FieldSelectors,
    pub link: FieldSelectors,
    pub title: FieldSelectors,
    pub price: FieldSelectors,
    pub location: FieldSelectors,
    pub description: FieldSelectors,
    pub posted: FieldSelectors,
    pub image: FieldSelectors,
    pub store_link: FieldSelectors,
    pub counter: FieldSelectors,
    pub promoted_badge: FieldSelectors,
    pub pagination_link: FieldSelectors,
    pub pagination_summary: FieldSelectors,
    pub promoted_class_fragments: Vec<String>,
    pub inactive_class_fragments: Vec<String>,
}
