//! Source adapters and the registry that routes requests to them.

pub mod bacakomik;
pub mod kiryuu;
pub mod komikcast;
pub mod scrape;
pub mod shinigami;
pub mod themes;

use crate::config::Config;
use crate::error::SourceError;
use crate::http_client::Fetcher;
use crate::models::{ChapterContent, ListQuery, MangaDetail, MangaSummary, SourceInfo};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Api,
    Scrape,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Api => "api",
            SourceKind::Scrape => "scrape",
        }
    }
}

/// Uniform contract every adapter implements
#[async_trait]
pub trait MangaSource: Send + Sync {
    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn base_url(&self) -> &str;

    /// One page of the source's catalogue
    async fn list(&self, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError>;

    /// Search; `term` is already normalized (see `normalize_search_query`)
    async fn search(&self, term: &str, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError>;

    async fn detail(&self, manga_id: &str) -> Result<MangaDetail, SourceError>;

    /// Reader pages. `manga_hint` is the manga id the client came from, used
    /// when the chapter payload does not name its manga.
    async fn chapter_pages(
        &self,
        chapter_id: &str,
        manga_hint: Option<&str>,
    ) -> Result<ChapterContent, SourceError>;

    /// Homepage highlights; may legitimately be empty
    async fn featured(&self) -> Result<Vec<MangaSummary>, SourceError>;

    /// Origins whose assets belong to this source (site first)
    fn asset_origins(&self) -> Vec<String> {
        vec![self.base_url().to_string()]
    }

    /// Whether requests to this source's hosts skip certificate checks
    fn accept_invalid_certs(&self) -> bool {
        false
    }

    fn info(&self) -> SourceInfo {
        SourceInfo {
            name: self.name().to_string(),
            kind: self.kind().as_str().to_string(),
            base_url: self.base_url().to_string(),
        }
    }
}

/// Name -> adapter lookup
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn MangaSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Arc<dyn MangaSource>) {
        self.sources.retain(|s| s.name() != source.name());
        self.sources.push(source);
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn MangaSource>> {
        let key = name.trim().to_lowercase();
        self.sources.iter().find(|s| s.name() == key).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<dyn MangaSource>, SourceError> {
        self.get(name)
            .ok_or_else(|| SourceError::UnknownSource(name.to_string()))
    }

    pub fn infos(&self) -> Vec<SourceInfo> {
        self.sources.iter().map(|s| s.info()).collect()
    }

    /// Find the adapter whose site or CDN host appears in `url`
    pub fn by_host(&self, url: &str) -> Option<Arc<dyn MangaSource>> {
        let host = url::Url::parse(url).ok()?.host_str()?.to_lowercase();
        self.sources
            .iter()
            .find(|s| {
                s.asset_origins().iter().any(|origin| {
                    url::Url::parse(origin)
                        .ok()
                        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
                        .map(|h| host == h || host.ends_with(&format!(".{}", h)))
                        .unwrap_or(false)
                })
            })
            .cloned()
    }

    /// Build every enabled source from configuration
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Self {
        let mut registry = Self::new();
        let api_timeout = Duration::from_secs(config.http.api_timeout_secs);
        let scrape_timeout = Duration::from_secs(config.http.scrape_timeout_secs);
        let sources = &config.sources;

        if sources.shinigami.enabled {
            registry.register(Arc::new(shinigami::ShinigamiSource::new(
                sources.shinigami.clone(),
                fetcher.clone(),
                api_timeout,
            )));
        }
        if sources.kiryuu.enabled {
            registry.register(Arc::new(scrape::ScrapeSource::new(
                kiryuu::profile(&sources.kiryuu.base_url),
                fetcher.clone(),
                scrape_timeout,
            )));
        }
        if sources.komikcast.enabled {
            registry.register(Arc::new(scrape::ScrapeSource::new(
                komikcast::profile(&sources.komikcast.base_url),
                fetcher.clone(),
                scrape_timeout,
            )));
        }
        if sources.bacakomik.enabled {
            registry.register(Arc::new(scrape::ScrapeSource::new(
                bacakomik::profile(&sources.bacakomik.base_url),
                fetcher,
                scrape_timeout,
            )));
        }
        log::info!(
            "Registered sources: {}",
            registry
                .sources
                .iter()
                .map(|s| s.name().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        registry
    }
}
