//! Shinigami: JSON API source with a separate storage CDN.
//!
//! Upstream payloads are decoded into the `Raw*` types below and converted to
//! the common model in one mapping function per entity. Pages are numbered
//! from 1 for this source.

use crate::config::ApiSourceConfig;
use crate::error::SourceError;
use crate::headers::{build_headers, HeaderProfile};
use crate::http_client::{FetchRequest, Fetcher};
use crate::models::{
    ChapterContent, ChapterInfo, ChapterSummary, ListQuery, MangaDetail, MangaSummary, PageData,
    Status,
};
use crate::normalize::{encode_query_term, finalize_list, join_url, normalize_api_cover};
use crate::sources::{MangaSource, SourceKind};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const NAME: &str = "shinigami";

const DEFAULT_SORT: &str = "latest";
const DEFAULT_ORDER: &str = "desc";
const FEATURED_SORT: &str = "popularity";
const FEATURED_SIZE: u32 = 12;
const UNKNOWN_TITLE: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    retcode: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawManga {
    #[serde(deserialize_with = "lenient::id")]
    manga_id: String,
    #[serde(deserialize_with = "lenient::text")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    alternative_title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    cover_image_url: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    cover_portrait_url: Option<String>,
    status: Option<Value>,
    #[serde(deserialize_with = "lenient::taxonomy")]
    taxonomy: Option<RawTaxonomy>,
    #[serde(deserialize_with = "lenient::float")]
    user_rate: Option<f64>,
    #[serde(deserialize_with = "lenient::count")]
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawTaxonomy {
    #[serde(rename = "Genre")]
    genre: Option<Vec<RawTerm>>,
    #[serde(rename = "Author")]
    author: Option<Vec<RawTerm>>,
    #[serde(rename = "Artist")]
    artist: Option<Vec<RawTerm>>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
struct RawTerm {
    #[serde(deserialize_with = "lenient::id")]
    name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawChapter {
    #[serde(deserialize_with = "lenient::id")]
    chapter_id: String,
    chapter_number: Value,
    #[serde(deserialize_with = "lenient::text")]
    chapter_title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    release_date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawChapterDetail {
    #[serde(deserialize_with = "lenient::id")]
    chapter_id: String,
    #[serde(deserialize_with = "lenient::text")]
    manga_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    manga_title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    cover_image_url: Option<String>,
    chapter_number: Value,
    #[serde(deserialize_with = "lenient::text")]
    chapter_title: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    prev_chapter_id: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    next_chapter_id: Option<String>,
    #[serde(deserialize_with = "lenient::files")]
    chapter: Option<RawChapterFiles>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawChapterFiles {
    #[serde(deserialize_with = "lenient::id")]
    path: String,
    #[serde(deserialize_with = "lenient::strings")]
    data: Vec<String>,
}

/// Field decoders that never fail: the API mixes numbers and strings for
/// ids and counts, and sends `null` or the wrong shape for absent values.
/// A bad field falls back to empty so one record cannot sink a whole page.
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar(&Value::deserialize(d)?).filter(|s| !s.is_empty()))
    }

    pub fn float<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        }
        .filter(|f: &f64| f.is_finite()))
    }

    pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().replace(['.', ','], "").parse().ok(),
            _ => None,
        })
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.iter().filter_map(scalar).collect(),
            _ => Vec::new(),
        })
    }

    /// Nested object that is dropped, not rejected, when malformed
    pub fn object<T: DeserializeOwned>(v: Value) -> Option<T> {
        match v {
            Value::Object(_) => serde_json::from_value(v).ok(),
            _ => None,
        }
    }

    pub fn taxonomy<'de, D: Deserializer<'de>>(d: D) -> Result<Option<super::RawTaxonomy>, D::Error> {
        Ok(object(Value::deserialize(d)?))
    }

    pub fn files<'de, D: Deserializer<'de>>(d: D) -> Result<Option<super::RawChapterFiles>, D::Error> {
        Ok(object(Value::deserialize(d)?))
    }
}

impl RawTaxonomy {
    fn names(bucket: &Option<Vec<RawTerm>>) -> Vec<String> {
        bucket
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|t| t.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

fn code_of(v: &Option<Value>) -> Option<i64> {
    match v.as_ref()? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn number_of(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().replace(',', ".").parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

pub struct ShinigamiSource {
    config: ApiSourceConfig,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl ShinigamiSource {
    pub fn new(config: ApiSourceConfig, fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self {
            config,
            fetcher,
            timeout,
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    pub fn list_url(&self, query: &ListQuery, term: Option<&str>) -> String {
        let sort = query.sort.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_SORT);
        let order = query.order.as_deref().filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_ORDER);
        let mut url = self.api(&format!(
            "/manga/list?page={}&page_size={}&sort={}&sort_order={}",
            query.page(),
            query.page_size(),
            encode(sort),
            encode(order)
        ));
        if let Some(t) = term {
            url.push_str("&q=");
            url.push_str(&encode_query_term(t));
        }
        url
    }

    async fn get_data<T: DeserializeOwned>(&self, url: String) -> Result<Option<T>, SourceError> {
        let req = FetchRequest::new(url)
            .headers(build_headers(&HeaderProfile::json(&self.config.site_base)))
            .timeout(self.timeout);
        let envelope: ApiEnvelope<T> = self.fetcher.fetch(req).await?.json()?;
        if envelope.data.is_none() {
            log::debug!(
                "Shinigami: empty data (retcode {:?}, message {:?})",
                envelope.retcode,
                envelope.message
            );
        }
        Ok(envelope.data)
    }

    async fn fetch_list(&self, url: String) -> Result<Vec<MangaSummary>, SourceError> {
        let raw: Vec<Value> = self.get_data(url).await?.unwrap_or_default();
        let out = finalize_list(self.decode_list(raw));
        log::info!("Shinigami: {} manga", out.len());
        Ok(out)
    }

    async fn fetch_manga(&self, manga_id: &str) -> Result<RawManga, SourceError> {
        self.get_data::<RawManga>(self.api(&format!("/manga/detail/{}", encode(manga_id))))
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("manga {}", manga_id)))
    }

    async fn fetch_chapters(&self, manga_id: &str) -> Result<Vec<RawChapter>, SourceError> {
        let url = self.api(&format!(
            "/chapter/{}/list?page=1&page_size={}&sort_by=chapter_number&sort_order=desc",
            encode(manga_id),
            self.config.chapter_page_size
        ));
        Ok(self.get_data(url).await?.unwrap_or_default())
    }

    /// Records are decoded one at a time; a non-object entry is skipped and
    /// records without a title are dropped later by `finalize_list`.
    fn decode_list(&self, raw: Vec<Value>) -> Vec<MangaSummary> {
        raw.into_iter()
            .filter_map(|v| {
                let manga = lenient::object::<RawManga>(v);
                if manga.is_none() {
                    log::debug!("Shinigami: skipping malformed list entry");
                }
                manga
            })
            .map(|m| self.map_summary(&m))
            .collect()
    }

    fn cover(&self, raw: &Option<String>) -> String {
        raw.as_deref()
            .map(|c| normalize_api_cover(&self.config.cdn_base, c))
            .unwrap_or_default()
    }

    fn map_summary(&self, raw: &RawManga) -> MangaSummary {
        let taxonomy = raw.taxonomy.clone().unwrap_or_default();
        let large = self.cover(&raw.cover_portrait_url);
        MangaSummary {
            source: NAME.to_string(),
            id: raw.manga_id.clone(),
            title: raw.title.clone().unwrap_or_default(),
            alt_title: non_empty(raw.alternative_title.clone()),
            cover: self.cover(&raw.cover_image_url),
            large_cover: Some(large).filter(|c| !c.is_empty()),
            status: Some(Status::from_code(code_of(&raw.status))),
            genres: RawTaxonomy::names(&taxonomy.genre),
            authors: RawTaxonomy::names(&taxonomy.author),
            link: if raw.manga_id.is_empty() {
                String::new()
            } else {
                format!(
                    "{}/series/{}",
                    self.config.site_base.trim_end_matches('/'),
                    raw.manga_id
                )
            },
        }
    }

    fn map_chapter(raw: RawChapter) -> ChapterSummary {
        let number = number_of(&raw.chapter_number);
        ChapterSummary {
            title: non_empty(raw.chapter_title).unwrap_or_else(|| format!("Chapter {}", number)),
            id: raw.chapter_id,
            number,
            release_date: raw.release_date.unwrap_or_default(),
        }
    }

    fn map_detail(&self, raw: &RawManga, chapters: Vec<RawChapter>) -> MangaDetail {
        let taxonomy = raw.taxonomy.clone().unwrap_or_default();
        let mut detail = MangaDetail::new(
            self.map_summary(raw),
            chapters.into_iter().map(Self::map_chapter).collect(),
        );
        detail.description = raw.description.clone().unwrap_or_default().trim().to_string();
        detail.artists = RawTaxonomy::names(&taxonomy.artist);
        detail.rating = raw.user_rate;
        detail.views = raw.view_count;
        detail
    }

    /// Page URLs are CDN base + storage path + bare filename
    fn map_content(
        &self,
        raw: RawChapterDetail,
        manga: Option<RawManga>,
        manga_hint: Option<&str>,
    ) -> ChapterContent {
        let files = raw.chapter.unwrap_or_default();
        let pages: Vec<PageData> = files
            .data
            .iter()
            .filter(|f| !f.trim().is_empty())
            .enumerate()
            .map(|(i, file)| PageData {
                index: i + 1,
                url: join_url(&[&self.config.cdn_base, &files.path, file.trim()]),
            })
            .collect();

        let manga_id = non_empty(raw.manga_id)
            .or_else(|| manga_hint.map(|s| s.to_string()))
            .unwrap_or_default();
        let manga_title = non_empty(raw.manga_title)
            .or_else(|| manga.as_ref().and_then(|m| m.title.clone()))
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
        let manga_cover = Some(self.cover(&raw.cover_image_url))
            .filter(|c| !c.is_empty())
            .or_else(|| manga.as_ref().map(|m| self.cover(&m.cover_image_url)))
            .unwrap_or_default();
        let chapter_number = number_of(&raw.chapter_number);

        ChapterContent {
            chapter_info: ChapterInfo {
                id: raw.chapter_id,
                manga_id,
                manga_title,
                manga_cover,
                chapter_number,
                chapter_title: non_empty(raw.chapter_title)
                    .unwrap_or_else(|| format!("Chapter {}", chapter_number)),
                total_pages: pages.len(),
                prev_chapter_id: non_empty(raw.prev_chapter_id),
                next_chapter_id: non_empty(raw.next_chapter_id),
            },
            pages,
        }
    }
}

#[async_trait]
impl MangaSource for ShinigamiSource {
    fn name(&self) -> &str {
        NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn base_url(&self) -> &str {
        &self.config.site_base
    }

    fn asset_origins(&self) -> Vec<String> {
        vec![
            self.config.site_base.clone(),
            self.config.cdn_base.clone(),
            self.config.api_base.clone(),
        ]
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError> {
        self.fetch_list(self.list_url(query, None)).await
    }

    async fn search(&self, term: &str, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError> {
        self.fetch_list(self.list_url(query, Some(term))).await
    }

    async fn detail(&self, manga_id: &str) -> Result<MangaDetail, SourceError> {
        let raw = self.fetch_manga(manga_id).await?;
        // A missing chapter list must not sink the whole detail page
        let chapters = match self.fetch_chapters(manga_id).await {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Shinigami: chapter list for {} failed: {}", manga_id, e);
                Vec::new()
            }
        };
        Ok(self.map_detail(&raw, chapters))
    }

    async fn chapter_pages(
        &self,
        chapter_id: &str,
        manga_hint: Option<&str>,
    ) -> Result<ChapterContent, SourceError> {
        let raw: RawChapterDetail = self
            .get_data(self.api(&format!("/chapter/detail/{}", encode(chapter_id))))
            .await?
            .ok_or_else(|| SourceError::NotFound(format!("chapter {}", chapter_id)))?;

        let needs_backfill = raw
            .manga_title
            .as_deref()
            .map(|t| t.trim().is_empty())
            .unwrap_or(true);
        let manga_id = non_empty(raw.manga_id.clone()).or_else(|| manga_hint.map(|s| s.to_string()));

        let manga = match (needs_backfill, manga_id) {
            (true, Some(id)) => match self.fetch_manga(&id).await {
                Ok(m) => Some(m),
                Err(e) => {
                    log::debug!("Shinigami: manga backfill for chapter {} failed: {}", chapter_id, e);
                    None
                }
            },
            _ => None,
        };

        Ok(self.map_content(raw, manga, manga_hint))
    }

    async fn featured(&self) -> Result<Vec<MangaSummary>, SourceError> {
        let query = ListQuery {
            page: Some(1),
            page_size: Some(FEATURED_SIZE),
            sort: Some(FEATURED_SORT.to_string()),
            order: Some(DEFAULT_ORDER.to_string()),
            q: None,
        };
        self.list(&query).await
    }
}
