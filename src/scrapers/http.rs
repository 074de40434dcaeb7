use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::RendererError;
use crate::scrapers::traits::PageRenderer;
use crate::scrapers::types::{RenderRequest, WaitCondition};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Fetches the server-rendered HTML without running scripts.
///
/// Wait conditions and scrolling have no meaning here and are ignored, so
/// ads injected client-side will be missing.
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(timeout: Duration) -> Result<Self, RendererError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RendererError::Browser(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn fetch_page(&self, request: &RenderRequest) -> Result<String, RendererError> {
        let url = request.url.as_str();

        if request.scroll_to_bottom || !matches!(request.wait, WaitCondition::Load) {
            debug!(url, "HTTP renderer ignores wait and scroll settings");
        }

        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RendererError::Timeout {
                        url: url.to_string(),
                        timeout_secs: request.timeout.as_secs(),
                    }
                } else {
                    RendererError::Network {
                        url: url.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", url, response.status());
            return Err(RendererError::Navigation {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        let html = response.text().await.map_err(|e| RendererError::Network {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })?;

        if html.trim().is_empty() {
            return Err(RendererError::EmptyContent {
                url: url.to_string(),
            });
        }

        debug!("Downloaded {} bytes of HTML", html.len());
        Ok(html)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
