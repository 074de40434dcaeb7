use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::{debug, info};

use crate::error::RendererError;
use crate::scrapers::traits::PageRenderer;
use crate::scrapers::types::{RenderRequest, WaitCondition};

const ACCEPT_COOKIES_JS: &str = r#"
    const button = document.querySelector('button[id*="accept"], button[class*="acceptAll"], button[id*="prihvat"]');
    if (button) button.click();
"#;

const SCROLL_JS: &str = "window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight";

const SCROLL_PAUSE: Duration = Duration::from_millis(700);
const MAX_SCROLL_STEPS: usize = 15;

/// Launch settings for the headless browser
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub window_size: (u32, u32),
    /// Browser is shut down after this long without commands
    pub idle_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1366, 900),
            idle_timeout: Duration::from_secs(300),
        }
    }
}

/// Renders search pages in headless Chrome so client-side content is present
pub struct ChromeRenderer {
    browser: Arc<Browser>,
}

impl ChromeRenderer {
    /// Launch a new browser; the caller owns it for the whole session
    pub fn launch(options: &ChromeOptions) -> Result<Self, RendererError> {
        info!(headless = options.headless, "Launching headless Chrome...");

        let launch_options = LaunchOptions::default_builder()
            .headless(options.headless)
            .window_size(Some(options.window_size))
            .idle_browser_timeout(options.idle_timeout)
            .build()
            .map_err(|e| RendererError::Browser(format!("invalid launch options: {e}")))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| RendererError::Browser(format!("failed to launch Chrome: {e}")))?;

        Ok(Self {
            browser: Arc::new(browser),
        })
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn fetch_page(&self, request: &RenderRequest) -> Result<String, RendererError> {
        let browser = Arc::clone(&self.browser);
        let request = request.clone();

        tokio::task::spawn_blocking(move || render(&browser, &request))
            .await
            .map_err(|e| RendererError::Browser(format!("render task aborted: {e}")))?
    }

    fn name(&self) -> &'static str {
        "chrome"
    }
}

fn render(browser: &Browser, request: &RenderRequest) -> Result<String, RendererError> {
    let tab = browser
        .new_tab()
        .map_err(|e| RendererError::Browser(format!("failed to open tab: {e}")))?;
    tab.set_default_timeout(request.timeout);

    let result = render_in_tab(&tab, request);

    if let Err(e) = tab.close(true) {
        debug!(url = %request.url, "failed to close tab: {e}");
    }

    result
}

fn render_in_tab(tab: &Tab, request: &RenderRequest) -> Result<String, RendererError> {
    let url = request.url.as_str();
    let timeout = || RendererError::Timeout {
        url: url.to_string(),
        timeout_secs: request.timeout.as_secs(),
    };

    debug!(url, "navigating");
    tab.navigate_to(url)
        .map_err(|e| RendererError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    tab.wait_until_navigated().map_err(|_| timeout())?;

    match &request.wait {
        WaitCondition::Load => {}
        WaitCondition::Selector(selector) => {
            tab.wait_for_element(selector).map_err(|_| timeout())?;
        }
        WaitCondition::Delay(delay) => thread::sleep(*delay),
    }

    // Cookie banner is optional; a missing button is not an error
    let _ = tab.evaluate(ACCEPT_COOKIES_JS, false);

    if request.scroll_to_bottom {
        scroll_to_bottom(tab);
    }

    let html = tab
        .get_content()
        .map_err(|e| RendererError::Browser(format!("failed to read page content: {e}")))?;

    if html.trim().is_empty() {
        return Err(RendererError::EmptyContent {
            url: url.to_string(),
        });
    }

    debug!(url, bytes = html.len(), "rendered page");
    Ok(html)
}

/// Scrolls until the document height stops growing so lazy images load.
fn scroll_to_bottom(tab: &Tab) {
    let mut last_height = 0.0;

    for step in 0..MAX_SCROLL_STEPS {
        let height = tab
            .evaluate(SCROLL_JS, false)
            .ok()
            .and_then(|result| result.value)
            .and_then(|value| value.as_f64())
            .unwrap_or_default();

        thread::sleep(SCROLL_PAUSE);

        if height <= last_height {
            debug!(step, height, "reached bottom of page");
            break;
        }
        last_height = height;
    }
}
