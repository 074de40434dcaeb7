use async_trait::async_trait;

use crate::error::RendererError;
use crate::models::CombinedResult;
use crate::scrapers::session::SessionMetadata;
use crate::scrapers::types::RenderRequest;

/// Supplies rendered HTML for a search URL.
///
/// The renderer owns navigation timeouts and its own browser or client
/// lifecycle; the session only borrows it for each fetch.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn fetch_page(&self, request: &RenderRequest) -> Result<String, RendererError>;

    /// Get the name of the renderer
    fn name(&self) -> &'static str;
}

/// Destination for a finished session's results
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(
        &self,
        result: &CombinedResult,
        metadata: &SessionMetadata,
    ) -> anyhow::Result<String>;
}
