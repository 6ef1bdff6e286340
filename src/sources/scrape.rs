//! Generic HTML adapter. A [`SiteProfile`] pairs a site with the selector
//! table of the theme it runs; everything else is shared.
//!
//! Parsing is kept in synchronous functions so the parsed document never
//! lives across an await point. Reader pages from this adapter are numbered
//! from 0.

use crate::error::SourceError;
use crate::extract::{
    absolutize, all_texts, clean_text, first_attr, first_nonempty, first_of, first_text, image_url,
    is_content_image, labeled_value, nav_id, page_image_url, sel, slug_from_link,
    strip_size_suffix, text_of, Extract,
};
use crate::headers::{build_headers, HeaderProfile};
use crate::http_client::{FetchRequest, Fetcher};
use crate::models::{
    ChapterContent, ChapterInfo, ChapterSummary, ListQuery, MangaDetail, MangaSummary, PageData,
    Status,
};
use crate::normalize::{
    clean_title, encode_query_term, finalize_list, parse_chapter_number, parse_rating, split_names,
};
use crate::sources::themes::{
    ThemeSelectors, ARTIST_LABELS, AUTHOR_LABELS, FALLBACK_TITLE, TITLE_BADGES,
};
use crate::sources::{MangaSource, SourceKind};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

const UNKNOWN_TITLE: &str = "Unknown";

/// Per-site settings layered over a theme
#[derive(Clone)]
pub struct SiteProfile {
    pub name: &'static str,
    pub base_url: String,
    pub theme: &'static ThemeSelectors,
    /// Site serves a certificate chain that does not verify
    pub accept_invalid_certs: bool,
    /// Header carrying a random token on every request
    pub anti_bot_header: Option<&'static str>,
    /// Site-specific rewrite applied to absolute cover URLs
    pub cover_fixup: fn(&str) -> String,
}

/// Reader data embedded by MangaThemesia as `ts_reader.run({...})`
#[derive(Debug, Default, PartialEq)]
struct ReaderScript {
    images: Vec<String>,
    prev: Option<String>,
    next: Option<String>,
}

fn ts_reader_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)ts_reader\.run\((\{.*?\})\);").expect("static regex"))
}

fn parse_reader_script(html: &str) -> Option<ReaderScript> {
    let caps = ts_reader_re().captures(html)?;
    let v: Value = serde_json::from_str(&caps[1]).ok()?;
    let images = v
        .pointer("/sources/0/images")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let nav = |key: &str| v.get(key).and_then(Value::as_str).map(|s| s.to_string());
    Some(ReaderScript {
        images,
        prev: nav("prevUrl"),
        next: nav("nextUrl"),
    })
}

fn fill(template: &str, holes: &[(&str, &str)]) -> String {
    holes
        .iter()
        .fold(template.to_string(), |acc, (k, v)| acc.replace(k, v))
}

fn encode_segment(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.trim().as_bytes()).collect()
}

pub struct ScrapeSource {
    profile: SiteProfile,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
}

impl ScrapeSource {
    pub fn new(profile: SiteProfile, fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self {
            profile,
            fetcher,
            timeout,
        }
    }

    fn theme(&self) -> &'static ThemeSelectors {
        self.profile.theme
    }

    fn site(&self, path: &str) -> String {
        format!("{}{}", self.profile.base_url.trim_end_matches('/'), path)
    }

    pub fn list_url(&self, query: &ListQuery) -> String {
        let page = query.page().to_string();
        let order = query
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.theme().default_order);
        let order = encode_segment(order);
        self.site(&fill(
            self.theme().list_path,
            &[("{page}", &page), ("{order}", &order)],
        ))
    }

    pub fn search_url(&self, term: &str, query: &ListQuery) -> String {
        let page = query.page().to_string();
        let q = encode_query_term(term);
        self.site(&fill(
            self.theme().search_path,
            &[("{page}", &page), ("{q}", &q)],
        ))
    }

    pub fn manga_url(&self, manga_id: &str) -> String {
        self.site(&fill(self.theme().manga_path, &[("{id}", &encode_segment(manga_id))]))
    }

    pub fn chapter_url(&self, chapter_id: &str, manga_hint: Option<&str>) -> Result<String, SourceError> {
        let manga = manga_hint.map(str::trim).filter(|m| !m.is_empty());
        if self.theme().chapter_needs_manga && manga.is_none() {
            return Err(SourceError::Validation(format!(
                "{} chapters need the manga id (?manga=)",
                self.profile.name
            )));
        }
        Ok(self.site(&fill(
            self.theme().chapter_path,
            &[
                ("{id}", &encode_segment(chapter_id)),
                ("{manga}", &encode_segment(manga.unwrap_or_default())),
            ],
        )))
    }

    async fn fetch_html(&self, url: String) -> Result<String, SourceError> {
        let headers = build_headers(
            &HeaderProfile::html(&self.profile.base_url).with_anti_bot(self.profile.anti_bot_header),
        );
        let req = FetchRequest::new(url)
            .headers(headers)
            .accept_invalid_certs(self.profile.accept_invalid_certs)
            .timeout(self.timeout);
        Ok(self.fetcher.fetch(req).await?.text())
    }

    /// Absolute, unsized, site-fixed cover URL; empty input stays empty
    pub fn normalize_cover(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }
        let abs = absolutize(&self.profile.base_url, raw);
        (self.profile.cover_fixup)(&strip_size_suffix(&abs))
    }

    fn cover_in(&self, scope: ElementRef<'_>, candidates: &[&str]) -> String {
        candidates
            .iter()
            .filter_map(|css| sel(css))
            .find_map(|s| scope.select(&s).find_map(image_url))
            .map(|c| self.normalize_cover(&c))
            .unwrap_or_default()
    }

    fn item_from(
        &self,
        el: ElementRef<'_>,
        links: &[&str],
        titles: &[Extract],
        loose: bool,
    ) -> Option<MangaSummary> {
        let theme = self.theme();
        let href = first_attr(el, links, "href")?;
        let link = absolutize(&self.profile.base_url, &href);
        let title = first_of(el, titles)?;
        let title = if loose {
            clean_title(&title, &all_texts(el, TITLE_BADGES))?
        } else {
            clean_text(&title)
        };
        Some(MangaSummary {
            source: self.profile.name.to_string(),
            id: slug_from_link(&link),
            title,
            alt_title: None,
            cover: self.cover_in(el, theme.item_cover),
            large_cover: None,
            status: first_text(el, theme.item_status).map(|s| Status::from_label(&s)),
            genres: Vec::new(),
            authors: Vec::new(),
            link,
        })
    }

    /// First container candidate yielding at least one valid record wins
    fn sweep(&self, root: ElementRef<'_>, containers: &[&str], loose: bool) -> Vec<MangaSummary> {
        let theme = self.theme();
        let (links, titles) = if loose {
            (&["a[href]"][..], FALLBACK_TITLE)
        } else {
            (theme.item_link, theme.item_title)
        };
        for css in containers {
            let found = first_nonempty(root, &[*css]);
            let items = finalize_list(
                found
                    .into_iter()
                    .filter_map(|el| self.item_from(el, links, titles, loose))
                    .collect(),
            );
            if !items.is_empty() {
                return items;
            }
        }
        Vec::new()
    }

    /// Catalogue or search results page
    pub fn parse_listing(&self, html: &str) -> Vec<MangaSummary> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let items = self.sweep(root, self.theme().list_items, false);
        if !items.is_empty() {
            return items;
        }
        log::debug!("{}: primary containers empty, trying generic sweep", self.profile.name);
        self.sweep(root, self.theme().fallback_items, true)
    }

    /// Homepage highlight block, falling back to the generic sweep
    pub fn parse_featured(&self, html: &str) -> Vec<MangaSummary> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let items = self.sweep(root, self.theme().featured_items, false);
        if !items.is_empty() {
            return items;
        }
        self.sweep(root, self.theme().fallback_items, true)
    }

    fn credits(&self, root: ElementRef<'_>, links: &[&str], labels: &[&str]) -> Vec<String> {
        let linked = all_texts(root, links);
        if !linked.is_empty() {
            return linked;
        }
        labeled_value(root, labels)
            .map(|v| split_names(&v))
            .unwrap_or_default()
    }

    fn parse_chapter_rows(&self, root: ElementRef<'_>) -> Vec<ChapterSummary> {
        let theme = self.theme();
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for row in first_nonempty(root, theme.chapter_rows) {
            let Some(href) = first_attr(row, theme.chapter_link, "href") else {
                continue;
            };
            let link = absolutize(&self.profile.base_url, &href);
            let id = slug_from_link(&link);
            if id.is_empty() || !seen.insert(id.clone()) {
                continue;
            }
            let date = first_text(row, theme.chapter_date).unwrap_or_default();
            let mut title = first_text(row, theme.chapter_title).unwrap_or_default();
            // Some themes nest the date inside the link
            if !date.is_empty() {
                if let Some(stripped) = title.strip_suffix(date.as_str()) {
                    title = stripped.trim().to_string();
                }
            }
            let number = row
                .value()
                .attr("data-num")
                .and_then(|n| n.trim().replace(',', ".").parse::<f64>().ok())
                .unwrap_or_else(|| {
                    let n = parse_chapter_number(&title);
                    if n > 0.0 {
                        n
                    } else {
                        parse_chapter_number(&id)
                    }
                });
            if title.is_empty() {
                title = format!("Chapter {}", number);
            }
            out.push(ChapterSummary {
                id,
                number,
                title,
                release_date: date,
            });
        }
        out
    }

    /// Series page. A page without a title is not a series page.
    pub fn parse_detail(&self, html: &str, manga_id: &str, url: &str) -> Result<MangaDetail, SourceError> {
        let doc = Html::parse_document(html);
        let root = doc.root_element();
        let theme = self.theme();

        let title = first_text(root, theme.detail_title)
            .ok_or_else(|| SourceError::NotFound(format!("{} manga {}", self.profile.name, manga_id)))?;

        let summary = MangaSummary {
            source: self.profile.name.to_string(),
            id: manga_id.to_string(),
            title,
            alt_title: first_of(root, theme.detail_alt_title),
            cover: self.cover_in(root, theme.detail_cover),
            large_cover: None,
            status: Some(
                first_of(root, theme.detail_status)
                    .map(|s| Status::from_label(&s))
                    .unwrap_or_default(),
            ),
            genres: all_texts(root, theme.detail_genres),
            authors: self.credits(root, theme.detail_author_links, AUTHOR_LABELS),
            link: url.to_string(),
        };

        let mut detail = MangaDetail::new(summary, self.parse_chapter_rows(root));
        detail.description = first_text(root, theme.detail_description).unwrap_or_default();
        detail.artists = self.credits(root, theme.detail_artist_links, ARTIST_LABELS);
        detail.rating = first_text(root, theme.detail_rating).and_then(|r| parse_rating(&r));
        Ok(detail)
    }

    /// Reader page
    pub fn parse_chapter(&self, html: &str, chapter_id: &str, manga_hint: Option<&str>) -> ChapterContent {
        let theme = self.theme();
        let script = parse_reader_script(html);
        let doc = Html::parse_document(html);
        let root = doc.root_element();

        let mut urls: Vec<String> = Vec::new();
        for css in theme.reader_images {
            let Some(s) = sel(css) else { continue };
            urls = root
                .select(&s)
                .filter_map(page_image_url)
                .filter(|u| is_content_image(u))
                .collect();
            if !urls.is_empty() {
                break;
            }
        }
        if urls.is_empty() {
            if let Some(script) = &script {
                urls = script.images.iter().filter(|u| is_content_image(u)).cloned().collect();
            }
        }
        let pages: Vec<PageData> = urls
            .iter()
            .enumerate()
            .map(|(index, u)| PageData {
                index,
                url: absolutize(&self.profile.base_url, u),
            })
            .collect();

        let prev = nav_id(first_attr(root, theme.reader_prev, "href").as_deref())
            .or_else(|| script.as_ref().and_then(|s| nav_id(s.prev.as_deref())));
        let next = nav_id(first_attr(root, theme.reader_next, "href").as_deref())
            .or_else(|| script.as_ref().and_then(|s| nav_id(s.next.as_deref())));

        let manga_link = theme
            .reader_manga_link
            .iter()
            .filter_map(|css| sel(css))
            .find_map(|s| root.select(&s).find(|a| a.value().attr("href").is_some()));
        let manga_id = manga_link
            .and_then(|a| a.value().attr("href"))
            .map(slug_from_link)
            .filter(|s| !s.is_empty())
            .or_else(|| manga_hint.map(|h| h.trim().to_string()))
            .unwrap_or_default();
        let manga_title = manga_link
            .map(text_of)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

        let chapter_title = first_text(root, theme.reader_title).unwrap_or_default();
        let chapter_number = {
            let n = parse_chapter_number(&chapter_title);
            if n > 0.0 {
                n
            } else {
                parse_chapter_number(chapter_id)
            }
        };

        ChapterContent {
            chapter_info: ChapterInfo {
                id: chapter_id.to_string(),
                manga_id,
                manga_title,
                manga_cover: String::new(),
                chapter_number,
                chapter_title: if chapter_title.is_empty() {
                    format!("Chapter {}", chapter_number)
                } else {
                    chapter_title
                },
                total_pages: pages.len(),
                prev_chapter_id: prev,
                next_chapter_id: next,
            },
            pages,
        }
    }
}

#[async_trait]
impl MangaSource for ScrapeSource {
    fn name(&self) -> &str {
        self.profile.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Scrape
    }

    fn base_url(&self) -> &str {
        &self.profile.base_url
    }

    fn accept_invalid_certs(&self) -> bool {
        self.profile.accept_invalid_certs
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError> {
        let html = self.fetch_html(self.list_url(query)).await?;
        let items = self.parse_listing(&html);
        log::info!("{}: {} manga on page {}", self.profile.name, items.len(), query.page());
        Ok(items)
    }

    async fn search(&self, term: &str, query: &ListQuery) -> Result<Vec<MangaSummary>, SourceError> {
        let html = self.fetch_html(self.search_url(term, query)).await?;
        let items = self.parse_listing(&html);
        log::info!("{}: {} results for '{}'", self.profile.name, items.len(), term);
        Ok(items)
    }

    async fn detail(&self, manga_id: &str) -> Result<MangaDetail, SourceError> {
        let url = self.manga_url(manga_id);
        let html = self.fetch_html(url.clone()).await?;
        let detail = self.parse_detail(&html, manga_id, &url)?;
        if detail.chapters.is_empty() {
            log::warn!("{}: no chapters found for {}", self.profile.name, manga_id);
        }
        Ok(detail)
    }

    async fn chapter_pages(
        &self,
        chapter_id: &str,
        manga_hint: Option<&str>,
    ) -> Result<ChapterContent, SourceError> {
        let url = self.chapter_url(chapter_id, manga_hint)?;
        let html = self.fetch_html(url).await?;
        let content = self.parse_chapter(&html, chapter_id, manga_hint);
        if content.pages.is_empty() {
            log::warn!("{}: chapter {} has no images", self.profile.name, chapter_id);
        }
        Ok(content)
    }

    async fn featured(&self) -> Result<Vec<MangaSummary>, SourceError> {
        let html = self.fetch_html(self.site("/")).await?;
        Ok(self.parse_featured(&html))
    }
}
