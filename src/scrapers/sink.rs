use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::SinkError;
use crate::models::{
    CombinedResult, CombinedStats, PageBreakdown, ParseError, ParseWarning, ParsedAdResult,
};
use crate::scrapers::session::SessionMetadata;
use crate::scrapers::traits::ResultSink;

/// Serialized layout of one session's output file
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport<'a> {
    pub metadata: &'a SessionMetadata,
    pub stats: &'a CombinedStats,
    pub pages: &'a [PageBreakdown],
    /// Newest first, undated ads last
    pub ads: Vec<&'a ParsedAdResult>,
    pub errors: &'a [ParseError],
    pub warnings: &'a [ParseWarning],
}

impl<'a> SessionReport<'a> {
    pub fn new(result: &'a CombinedResult, metadata: &'a SessionMetadata) -> Self {
        Self {
            metadata,
            stats: &result.stats,
            pages: &result.pages,
            ads: result.sorted_by_posted_date(),
            errors: &result.errors,
            warnings: &result.warnings,
        }
    }
}

/// Writes each session to `<dir>/ads_<timestamp>.json`
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, path: &Path, contents: String) -> Result<(), SinkError> {
        let io_error = |source| SinkError::Io {
            path: path.display().to_string(),
            source,
        };
        tokio::fs::create_dir_all(&self.dir).await.map_err(io_error)?;
        tokio::fs::write(path, contents).await.map_err(io_error)
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(
        &self,
        result: &CombinedResult,
        metadata: &SessionMetadata,
    ) -> anyhow::Result<String> {
        let report = SessionReport::new(result, metadata);
        let json = serde_json::to_string_pretty(&report).map_err(SinkError::from)?;

        let filename = format!(
            "ads_{}.json",
            metadata.finished_at.format("%Y%m%d_%H%M%S")
        );
        let path = self.dir.join(filename);
        self.write(&path, json).await?;

        info!("💾 Saved {} ads to {}", result.ads.len(), path.display());
        Ok(path.display().to_string())
    }
}
