//! "Check updates" for a reader's library: one detail fetch per tracked
//! manga, strictly sequential with a fixed pause between upstream calls.
//!
//! `hasUpdate` compares the highest chapter number against the last read
//! number. Series that renumber chapters are reported wrongly; this is a
//! known approximation.

use crate::error::SourceError;
use crate::metrics::{track_request, MetricsTracker};
use crate::sources::{MangaSource, SourceRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    pub source: String,
    pub manga_id: String,
    #[serde(default)]
    pub last_read_chapter: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub items: Vec<UpdateItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub source: String,
    pub manga_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub last_read_chapter: f64,
    pub latest_chapter: Option<f64>,
    pub has_update: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub success: bool,
    pub data: Vec<UpdateResult>,
}

impl UpdateResult {
    fn failed(item: &UpdateItem, error: &SourceError) -> Self {
        Self {
            source: item.source.clone(),
            manga_id: item.manga_id.clone(),
            title: None,
            last_read_chapter: item.last_read_chapter,
            latest_chapter: None,
            has_update: false,
            error: Some(error.to_string()),
        }
    }
}

pub struct UpdateChecker<'a> {
    registry: &'a SourceRegistry,
    metrics: &'a MetricsTracker,
    delay: Duration,
    max_items: usize,
}

impl<'a> UpdateChecker<'a> {
    pub fn new(
        registry: &'a SourceRegistry,
        metrics: &'a MetricsTracker,
        delay: Duration,
        max_items: usize,
    ) -> Self {
        Self {
            registry,
            metrics,
            delay,
            max_items,
        }
    }

    /// Checks that need no upstream call
    fn resolve(&self, item: &UpdateItem) -> Result<Arc<dyn MangaSource>, SourceError> {
        if item.manga_id.trim().is_empty() {
            return Err(SourceError::Validation("mangaId must not be empty".to_string()));
        }
        self.registry.require(&item.source)
    }

    async fn check_one(
        &self,
        item: &UpdateItem,
        source: &dyn MangaSource,
    ) -> Result<UpdateResult, SourceError> {
        let detail = track_request(self.metrics, source.name(), source.detail(item.manga_id.trim())).await?;
        let latest = detail.latest_chapter_number();
        Ok(UpdateResult {
            source: source.name().to_string(),
            manga_id: item.manga_id.clone(),
            title: Some(detail.summary.title),
            last_read_chapter: item.last_read_chapter,
            latest_chapter: latest,
            has_update: latest.map(|n| n > item.last_read_chapter).unwrap_or(false),
            error: None,
        })
    }

    /// Results come back in request order. Only an over-long request fails
    /// as a whole; every other failure stays on its own item. The pause
    /// separates upstream calls, so items rejected locally cost no time.
    pub async fn check(&self, items: &[UpdateItem]) -> Result<Vec<UpdateResult>, SourceError> {
        if items.len() > self.max_items {
            return Err(SourceError::Validation(format!(
                "At most {} items per update check",
                self.max_items
            )));
        }
        let mut results = Vec::with_capacity(items.len());
        let mut called_upstream = false;
        for item in items {
            let outcome = match self.resolve(item) {
                Ok(source) => {
                    if called_upstream && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    called_upstream = true;
                    self.check_one(item, source.as_ref()).await
                }
                Err(e) => Err(e),
            };
            let result = match outcome {
                Ok(r) => r,
                Err(e) => {
                    log::warn!("Update check {}/{} failed: {}", item.source, item.manga_id, e);
                    UpdateResult::failed(item, &e)
                }
            };
            results.push(result);
        }
        let updated = results.iter().filter(|r| r.has_update).count();
        log::info!("Update check: {} of {} items have new chapters", updated, results.len());
        Ok(results)
    }
}
