use serde::{Deserialize, Serialize};

/// Publication status normalized across sources
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    Ongoing,
    Completed,
    Hiatus,
    #[default]
    Unknown,
}

impl Status {
    /// Map a numeric API status code. 1/2/3 are the only meaningful codes.
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(1) => Status::Ongoing,
            Some(2) => Status::Completed,
            Some(3) => Status::Hiatus,
            _ => Status::Unknown,
        }
    }

    /// Map a scraped status label (English or Indonesian)
    pub fn from_label(label: &str) -> Self {
        let l = label.trim().to_lowercase();
        if l.contains("ongoing") || l.contains("berjalan") || l.contains("on going") {
            Status::Ongoing
        } else if l.contains("completed")
            || l.contains("complete")
            || l.contains("tamat")
            || l.contains("selesai")
            || l == "end"
        {
            Status::Completed
        } else if l.contains("hiatus") {
            Status::Hiatus
        } else {
            Status::Unknown
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MangaSummary {
    pub source: String,
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_title: Option<String>,
    pub cover: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    pub genres: Vec<String>,
    pub authors: Vec<String>,
    pub link: String,
}

impl MangaSummary {
    /// A record needs a title and something to show or follow
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
            && (!self.cover.trim().is_empty() || !self.link.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterSummary {
    pub id: String,
    pub number: f64,
    pub title: String,
    pub release_date: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MangaDetail {
    #[serde(flatten)]
    pub summary: MangaSummary,
    pub description: String,
    pub artists: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    pub chapters: Vec<ChapterSummary>,
    pub total_chapters: usize,
}

impl MangaDetail {
    pub fn new(summary: MangaSummary, chapters: Vec<ChapterSummary>) -> Self {
        let total_chapters = chapters.len();
        Self {
            summary,
            description: String::new(),
            artists: Vec::new(),
            rating: None,
            views: None,
            chapters,
            total_chapters,
        }
    }

    /// Highest chapter number, used by the update checker
    pub fn latest_chapter_number(&self) -> Option<f64> {
        self.chapters
            .iter()
            .map(|c| c.number)
            .fold(None, |acc, n| match acc {
                Some(m) if m >= n => Some(m),
                _ => Some(n),
            })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterInfo {
    pub id: String,
    pub manga_id: String,
    pub manga_title: String,
    pub manga_cover: String,
    pub chapter_number: f64,
    pub chapter_title: String,
    pub total_pages: usize,
    pub prev_chapter_id: Option<String>,
    pub next_chapter_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PageData {
    pub index: usize,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChapterContent {
    pub chapter_info: ChapterInfo,
    pub pages: Vec<PageData>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 24;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Listing parameters as accepted from the client
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub q: Option<String>,
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.filter(|p| *p > 0).unwrap_or(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

/// Listing envelope returned by `/sources/{source}` and `/search`
#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub source: String,
    pub page: u32,
    pub count: usize,
    pub data: Vec<MangaSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub success: bool,
    pub data: MangaDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChapterResponse {
    pub success: bool,
    pub chapter: ChapterInfo,
    pub pages: Vec<PageData>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeaturedResponse {
    pub success: bool,
    pub source: String,
    pub data: Vec<MangaSummary>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub kind: String,
    pub base_url: String,
}
