use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::parser::{ExtractorOptions, PageParser, SelectorConfig, SelectorOverrides, BASE_URL};
use crate::scrapers::{ChromeOptions, SearchParameters, SessionConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chrome, runs the page's scripts
    Chrome,
    /// Plain HTTP fetch of the server-rendered HTML
    Http,
}

/// Everything one run needs, assembled once at startup
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search: SearchParameters,
    pub session: SessionConfig,
    pub chrome: ChromeOptions,
    pub renderer: RendererKind,
    pub base_url: String,
    pub output_dir: PathBuf,
    /// JSON file with [`SelectorOverrides`]
    pub selectors_path: Option<PathBuf>,
    pub default_has_delivery: bool,
}

impl ScrapeConfig {
    pub fn new(search: SearchParameters) -> Self {
        Self {
            search,
            session: SessionConfig::default(),
            chrome: ChromeOptions::default(),
            renderer: RendererKind::Chrome,
            base_url: BASE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            selectors_path: None,
            default_has_delivery: false,
        }
    }

    pub fn navigation_timeout(&self) -> Duration {
        self.session.navigation_timeout
    }

    /// Default selectors merged with the optional override file, compiled once.
    pub fn build_parser(&self) -> anyhow::Result<PageParser> {
        let overrides = match &self.selectors_path {
            Some(path) => load_selector_overrides(path)?,
            None => SelectorOverrides::default(),
        };

        let selectors = SelectorConfig::default()
            .with_overrides(overrides)
            .compile()
            .context("compile selectors")?;
        let options = ExtractorOptions::new(&self.base_url)
            .context("parse base URL")?
            .with_delivery(self.default_has_delivery);

        Ok(PageParser::with_config(selectors, options))
    }
}

pub fn load_selector_overrides(path: &Path) -> anyhow::Result<SelectorOverrides> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("read selector overrides: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parse selector overrides: {}", path.display()))
}
