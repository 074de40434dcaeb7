use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use kp_scout::config::{RendererKind, ScrapeConfig};
use kp_scout::scrapers::SearchParameters;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RendererArg {
    Chrome,
    Http,
}

impl From<RendererArg> for RendererKind {
    fn from(arg: RendererArg) -> Self {
        match arg {
            RendererArg::Chrome => RendererKind::Chrome,
            RendererArg::Http => RendererKind::Http,
        }
    }
}

/// Scrape marketplace search results into structured JSON
#[derive(Debug, Parser)]
#[command(name = "kp-scout", version, about)]
pub struct Cli {
    /// Search keywords
    #[arg(short, long, env = "KP_KEYWORDS")]
    pub keywords: String,

    #[arg(long)]
    pub category_id: Option<String>,

    #[arg(long)]
    pub group_id: Option<String>,

    /// Only listings with a stated price
    #[arg(long)]
    pub has_price: bool,

    /// Sort order passed to the site
    #[arg(long)]
    pub order: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long)]
    pub min_price: Option<u64>,

    #[arg(long)]
    pub max_price: Option<u64>,

    /// Maximum number of result pages to scrape
    #[arg(long, default_value_t = 5, env = "KP_MAX_PAGES")]
    pub max_pages: u32,

    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "KP_HEADLESS")]
    pub headless: bool,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 30, env = "KP_TIMEOUT_SECS")]
    pub timeout_secs: u64,

    /// Scroll each page to the bottom before reading it
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub scroll: bool,

    /// Pause between page fetches in milliseconds
    #[arg(long, default_value_t = 2000, env = "KP_DELAY_MS")]
    pub delay_ms: u64,

    /// Pages fetched at once after the first
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    #[arg(long, value_enum, default_value_t = RendererArg::Chrome)]
    pub renderer: RendererArg,

    #[arg(long, default_value = "output", env = "KP_OUTPUT_DIR")]
    pub output_dir: PathBuf,

    /// JSON file overriding the built-in CSS selectors
    #[arg(long)]
    pub selectors: Option<PathBuf>,

    /// Save each page's HTML next to the results
    #[arg(long)]
    pub save_html: bool,
}

impl Cli {
    pub fn into_config(self) -> ScrapeConfig {
        let search = SearchParameters {
            keywords: self.keywords,
            category_id: self.category_id,
            group_id: self.group_id,
            has_price: self.has_price.then_some(true),
            order: self.order,
            location: self.location,
            min_price: self.min_price,
            max_price: self.max_price,
        };

        let mut config = ScrapeConfig::new(search);
        config.session.max_pages = self.max_pages;
        config.session.navigation_timeout = Duration::from_secs(self.timeout_secs);
        config.session.scroll_to_bottom = self.scroll;
        config.session.page_delay = Duration::from_millis(self.delay_ms);
        config.session.concurrency = self.concurrency;
        if self.save_html {
            config.session.html_dir = Some(self.output_dir.join("html"));
        }
        config.chrome.headless = self.headless;
        config.renderer = self.renderer.into();
        config.output_dir = self.output_dir;
        config.selectors_path = self.selectors;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Cli::try_parse_from(["kp-scout", "--keywords", "ps5"])
            .unwrap()
            .into_config();
        assert_eq!(config.search.keywords, "ps5");
        assert_eq!(config.search.has_price, None);
        assert_eq!(config.session.max_pages, 5);
        assert!(config.chrome.headless);
        assert!(config.session.html_dir.is_none());
    }

    #[test]
    fn flags_reach_the_config() {
        let config = Cli::try_parse_from([
            "kp-scout",
            "-k",
            "bicikl",
            "--has-price",
            "--max-pages",
            "2",
            "--headless",
            "false",
            "--renderer",
            "http",
            "--save-html",
            "--output-dir",
            "out",
        ])
        .unwrap()
        .into_config();

        assert_eq!(config.search.has_price, Some(true));
        assert_eq!(config.session.max_pages, 2);
        assert!(!config.chrome.headless);
        assert_eq!(config.renderer, RendererKind::Http);
        assert_eq!(config.session.html_dir, Some(PathBuf::from("out/html")));
    }
}
