//! Selector tables for the CMS theme families the scraped sites run on.
//!
//! Each field is an ordered candidate list; earlier entries win. Paths are
//! templates with `{page}`, `{order}`, `{q}`, `{id}` and `{manga}` holes.

use crate::extract::{labeled_value, Extract};
use scraper::ElementRef;

pub const STATUS_LABELS: &[&str] = &["status"];
pub const AUTHOR_LABELS: &[&str] = &["author", "pengarang", "penulis", "komikus"];
pub const ARTIST_LABELS: &[&str] = &["artist", "ilustrator", "illustrator", "seniman"];
pub const ALT_LABELS: &[&str] = &["alternative", "alternatif", "judul alternatif", "other name"];

fn status_row(el: ElementRef<'_>) -> Option<String> {
    labeled_value(el, STATUS_LABELS)
}

fn alt_row(el: ElementRef<'_>) -> Option<String> {
    labeled_value(el, ALT_LABELS)
}

pub struct ThemeSelectors {
    pub name: &'static str,

    pub list_path: &'static str,
    pub default_order: &'static str,
    pub search_path: &'static str,
    pub manga_path: &'static str,
    pub chapter_path: &'static str,
    /// Chapter URLs embed the manga slug (`{manga}` in `chapter_path`)
    pub chapter_needs_manga: bool,

    pub list_items: &'static [&'static str],
    pub fallback_items: &'static [&'static str],
    pub item_link: &'static [&'static str],
    pub item_title: &'static [Extract],
    pub item_cover: &'static [&'static str],
    pub item_status: &'static [&'static str],
    pub featured_items: &'static [&'static str],

    pub detail_title: &'static [&'static str],
    pub detail_alt_title: &'static [Extract],
    pub detail_description: &'static [&'static str],
    pub detail_cover: &'static [&'static str],
    pub detail_status: &'static [Extract],
    pub detail_genres: &'static [&'static str],
    pub detail_author_links: &'static [&'static str],
    pub detail_artist_links: &'static [&'static str],
    pub detail_rating: &'static [&'static str],

    pub chapter_rows: &'static [&'static str],
    pub chapter_link: &'static [&'static str],
    pub chapter_title: &'static [&'static str],
    pub chapter_date: &'static [&'static str],

    pub reader_title: &'static [&'static str],
    pub reader_images: &'static [&'static str],
    pub reader_prev: &'static [&'static str],
    pub reader_next: &'static [&'static str],
    pub reader_manga_link: &'static [&'static str],
}

/// Generic sweep used when a listing's primary container matches nothing
pub const FALLBACK_ITEMS: &[&str] = &["article", ".manga", ".serie-box", ".bs", ".bsx", ".utao .uta"];

/// Title chain for items found by the generic sweep
pub const FALLBACK_TITLE: &[Extract] = &[
    Extract::Attr("a[href]", "title"),
    Extract::Text("h2"),
    Extract::Text("h3"),
    Extract::Text("h4"),
    Extract::Text("a[href]"),
];

/// Type and "hot"/"new" badge elements rendered inside item blocks
pub const TITLE_BADGES: &[&str] = &[".type, .hotx, .colored, .novelabel, .badge, .mtype"];

/// MangaThemesia (the "bsx" WordPress theme used by most Indonesian readers)
pub static MANGATHEMESIA: ThemeSelectors = ThemeSelectors {
    name: "mangathemesia",

    list_path: "/manga/?page={page}&order={order}",
    default_order: "update",
    search_path: "/page/{page}/?s={q}",
    manga_path: "/manga/{id}/",
    chapter_path: "/{id}/",
    chapter_needs_manga: false,

    list_items: &["div.listupd .bs .bsx", "div.listupd .bsx", "div.bsx"],
    fallback_items: FALLBACK_ITEMS,
    item_link: &["a[href]"],
    item_title: &[
        Extract::Text(".tt"),
        Extract::Attr("a[href]", "title"),
        Extract::Text(".bigor .tt"),
        Extract::Text("a[href]"),
    ],
    item_cover: &["img.ts-post-image", "img"],
    item_status: &[".status", "span.status i"],
    featured_items: &[".hotslid .bs .bsx", ".popconslide .bsx", ".serieslist.pop li", ".listupd .bsx"],

    detail_title: &["h1.entry-title", ".seriestuheader h1", ".infox h1", "h1"],
    detail_alt_title: &[
        Extract::Text(".alternative"),
        Extract::Text(".seriestualt"),
        Extract::Custom(alt_row),
    ],
    detail_description: &[
        ".entry-content[itemprop=description]",
        ".seriestuhead .entry-content",
        ".entry-content",
        ".desc",
    ],
    detail_cover: &[".thumb img", ".seriestucontl .thumb img", ".infomanga img", "img.wp-post-image"],
    detail_status: &[
        Extract::Custom(status_row),
        Extract::Text(".tsinfo .imptdt:first-child i"),
        Extract::Text(".status"),
    ],
    detail_genres: &[".mgen a", ".seriestugenre a", ".genxed a", ".wd-full .mgen a"],
    detail_author_links: &[],
    detail_artist_links: &[],
    detail_rating: &[".num[itemprop=ratingValue]", ".rating .num", ".rating-prc .num", ".rating-prc"],

    chapter_rows: &["#chapterlist li", ".eplister li", ".bxcl li", ".cl li"],
    chapter_link: &["a[href]"],
    chapter_title: &[".chapternum", ".lchx a", ".eph-num .chapternum", "a[href]"],
    chapter_date: &[".chapterdate", ".dt", ".eph-num .chapterdate"],

    reader_title: &["h1.entry-title", ".headpost h1", "h1"],
    reader_images: &["#readerarea img", ".reader-area img", ".rdminimal img"],
    reader_prev: &["a.ch-prev-a", ".nextprev a[rel=prev]", "a[rel=prev]"],
    reader_next: &["a.ch-next-a", ".nextprev a[rel=next]", "a[rel=next]"],
    reader_manga_link: &[".allc a", ".ts-breadcrumb li:nth-child(2) a", ".headpost .allc a"],
};

/// Komikcast's own theme (a MangaThemesia descendant with renamed blocks)
pub static KOMIKCAST: ThemeSelectors = ThemeSelectors {
    name: "komikcast",

    list_path: "/daftar-komik/page/{page}/?order={order}",
    default_order: "update",
    search_path: "/page/{page}/?s={q}",
    manga_path: "/komik/{id}/",
    chapter_path: "/chapter/{id}/",
    chapter_needs_manga: false,

    list_items: &[".list-update_items-wrapper .list-update_item", ".list-update_item"],
    fallback_items: FALLBACK_ITEMS,
    item_link: &["a.data-tooltip[href]", "a[href]"],
    item_title: &[
        Extract::Text("h3.title"),
        Extract::Text(".title"),
        Extract::Attr("a[href]", "title"),
    ],
    item_cover: &[".list-update_item-image img", "img"],
    item_status: &[".status", ".list-update_item-info .status"],
    featured_items: &[".bixbox.hothome .swiper-slide", ".listupd.popularslider .list-update_item", ".list-update_item"],

    detail_title: &["h1.komik_info-content-body-title", ".komik_info-content-body h1", "h1"],
    detail_alt_title: &[
        Extract::Text(".komik_info-content-native"),
        Extract::Custom(alt_row),
    ],
    detail_description: &[".komik_info-description-sinopsis", ".komik_info-description", ".entry-content"],
    detail_cover: &[".komik_info-content-thumbnail img", ".komik_info-cover-image img", "img.wp-post-image"],
    detail_status: &[Extract::Custom(status_row), Extract::Text(".komik_info-content-info-status")],
    detail_genres: &[".komik_info-content-genre a", ".genre-info a"],
    detail_author_links: &[],
    detail_artist_links: &[],
    detail_rating: &[".data-rating strong", ".data-rating", ".rating-prc"],

    chapter_rows: &[".komik_info-chapters-item", "#chapter-wrapper li", ".komik_info-chapters li"],
    chapter_link: &["a.chapter-link-item", "a[href]"],
    chapter_title: &["a.chapter-link-item", "a[href]"],
    chapter_date: &[".chapter-link-time"],

    reader_title: &[".chapter_headpost h1", "h1"],
    reader_images: &[".main-reading-area img", "#chapter_body img", "#readerarea img"],
    reader_prev: &[".nextprev a[rel=prev]", "a[rel=prev]"],
    reader_next: &[".nextprev a[rel=next]", "a[rel=next]"],
    reader_manga_link: &[".allc a", ".chapter_breadcrumb a:nth-child(2)", ".chapter_headpost a"],
};

/// Madara (WP-Manga) theme
pub static MADARA: ThemeSelectors = ThemeSelectors {
    name: "madara",

    list_path: "/manga/page/{page}/?m_orderby={order}",
    default_order: "latest",
    search_path: "/page/{page}/?s={q}&post_type=wp-manga",
    manga_path: "/manga/{id}/",
    chapter_path: "/manga/{manga}/{id}/",
    chapter_needs_manga: true,

    list_items: &["div.page-item-detail", "div.page-listing-item", ".c-tabs-item__content"],
    fallback_items: FALLBACK_ITEMS,
    item_link: &["h3 a[href]", ".post-title a[href]", "a[href]"],
    item_title: &[
        Extract::Text("h3 a"),
        Extract::Text(".post-title"),
        Extract::Attr("a[href]", "title"),
    ],
    item_cover: &["img.img-responsive", "img"],
    item_status: &[".mg_status .summary-content", ".status"],
    featured_items: &[".manga-slider .slider__item", ".popular-slider .slider__item", "div.page-item-detail"],

    detail_title: &[".post-title h1", ".post-title h3", "h1"],
    detail_alt_title: &[Extract::Custom(alt_row)],
    detail_description: &[
        ".description-summary .summary__content",
        ".summary__content",
        ".manga-excerpt",
    ],
    detail_cover: &[".summary_image img", ".tab-summary img"],
    detail_status: &[Extract::Custom(status_row), Extract::Text(".post-status .summary-content")],
    detail_genres: &[".genres-content a", ".wp-manga-tags-list a"],
    detail_author_links: &[".author-content a"],
    detail_artist_links: &[".artist-content a"],
    detail_rating: &[".post-total-rating .score", "#averagerate", ".score"],

    chapter_rows: &["li.wp-manga-chapter", ".listing-chapters_wrap li", ".version-chap li"],
    chapter_link: &["a[href]"],
    chapter_title: &["a[href]"],
    chapter_date: &[".chapter-release-date"],

    reader_title: &["#chapter-heading", "h1"],
    reader_images: &[".reading-content img", ".page-break img"],
    reader_prev: &["a.prev_page", ".nav-previous a"],
    reader_next: &["a.next_page", ".nav-next a"],
    reader_manga_link: &[".breadcrumb li:nth-child(2) a", ".c-breadcrumb li:nth-child(2) a"],
};
