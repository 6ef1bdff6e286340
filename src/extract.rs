//! Selector fallback engine used by the HTML adapters.
//!
//! Every extraction point is an ordered list of [`Extract`] strategies; the
//! first one that yields a non-empty value wins. Site themes drift, so an
//! unparsable or unmatched candidate is skipped rather than treated as an
//! error.

use regex::Regex;
use scraper::{ElementRef, Selector};
use std::sync::OnceLock;
use url::Url;

/// Attributes consulted, in order, when `src` holds a lazy-load placeholder
const LAZY_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original"];

/// One way to pull a string out of an element
#[derive(Clone, Copy)]
pub enum Extract {
    /// Collapsed text of the first match
    Text(&'static str),
    /// Attribute of the first match carrying it
    Attr(&'static str, &'static str),
    /// Image URL of the first matching `img` (lazy-load aware)
    Image(&'static str),
    /// Arbitrary pure function
    Custom(fn(ElementRef<'_>) -> Option<String>),
}

impl Extract {
    pub fn apply(&self, scope: ElementRef<'_>) -> Option<String> {
        match *self {
            Extract::Text(css) => first_text(scope, &[css]),
            Extract::Attr(css, attr) => first_attr(scope, &[css], attr),
            Extract::Image(css) => {
                let s = sel(css)?;
                scope.select(&s).find_map(image_url)
            }
            Extract::Custom(f) => f(scope).filter(|v| !v.trim().is_empty()),
        }
    }
}

/// Apply strategies in order and take the first non-empty result
pub fn first_of(scope: ElementRef<'_>, chain: &[Extract]) -> Option<String> {
    chain.iter().find_map(|e| e.apply(scope))
}

pub fn sel(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(s) => Some(s),
        Err(_) => {
            log::debug!("Skipping invalid selector: {}", css);
            None
        }
    }
}

/// Collapse all whitespace runs to single spaces
pub fn clean_text(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn text_of(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Text of the first element, across candidates, whose text is non-empty
pub fn first_text(scope: ElementRef<'_>, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|css| {
        let s = sel(css)?;
        scope
            .select(&s)
            .map(text_of)
            .find(|t| !t.is_empty())
    })
}

/// Attribute of the first element, across candidates, carrying a non-empty value
pub fn first_attr(scope: ElementRef<'_>, candidates: &[&str], attr: &str) -> Option<String> {
    candidates.iter().find_map(|css| {
        let s = sel(css)?;
        scope
            .select(&s)
            .filter_map(|e| e.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(|v| v.to_string())
    })
}

/// All matches of the first candidate that matches anything
pub fn first_nonempty<'a>(scope: ElementRef<'a>, candidates: &[&str]) -> Vec<ElementRef<'a>> {
    for css in candidates {
        if let Some(s) = sel(css) {
            let found: Vec<ElementRef<'a>> = scope.select(&s).collect();
            if !found.is_empty() {
                return found;
            }
        }
    }
    Vec::new()
}

/// Texts of every match of the first candidate that yields any, deduplicated
pub fn all_texts(scope: ElementRef<'_>, candidates: &[&str]) -> Vec<String> {
    for css in candidates {
        if let Some(s) = sel(css) {
            let mut out: Vec<String> = Vec::new();
            for t in scope.select(&s).map(text_of) {
                if !t.is_empty() && !out.contains(&t) {
                    out.push(t);
                }
            }
            if !out.is_empty() {
                return out;
            }
        }
    }
    Vec::new()
}

/// Row shapes that pair a label with a value ("Status: Ongoing")
const LABELED_ROWS: &[&str] = &[
    ".tsinfo .imptdt",
    ".infotable tr",
    "table.inftable tr",
    ".komik_info-content-meta span",
    ".post-content_item",
    ".spe span",
];

/// Value child inside a labeled row, when the theme wraps it
const LABELED_VALUES: &[&str] = &["i", "td:nth-child(2)", ".summary-content"];

/// Value of the first labeled row whose label starts with one of `labels`
/// (lowercase ASCII).
pub fn labeled_value(scope: ElementRef<'_>, labels: &[&str]) -> Option<String> {
    for css in LABELED_ROWS {
        let Some(s) = sel(css) else { continue };
        for row in scope.select(&s) {
            let text = text_of(row);
            let lower = text.to_lowercase();
            let Some(label) = labels.iter().find(|l| lower.starts_with(**l)) else {
                continue;
            };
            if let Some(v) = first_text(row, LABELED_VALUES) {
                if !v.eq_ignore_ascii_case(label) {
                    return Some(v);
                }
            }
            let rest = text
                .get(label.len()..)
                .unwrap_or("")
                .trim_start_matches(|c: char| c == ':' || c.is_whitespace())
                .trim();
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }
    }
    None
}

pub fn is_placeholder_src(src: &str) -> bool {
    let s = src.trim();
    s.is_empty() || s.starts_with("data:")
}

/// Cover/thumbnail URL of an `img`: `src` unless it is a lazy-load
/// placeholder, then `data-src`, `data-lazy-src`, `data-original`.
pub fn image_url(img: ElementRef<'_>) -> Option<String> {
    let attrs = img.value();
    if let Some(src) = attrs.attr("src") {
        if !is_placeholder_src(src) {
            return Some(src.trim().to_string());
        }
    }
    LAZY_ATTRS
        .iter()
        .filter_map(|a| attrs.attr(a))
        .map(str::trim)
        .find(|v| !is_placeholder_src(v))
        .map(|v| v.to_string())
}

/// Reader page URL: `data-src` first, then `src`
pub fn page_image_url(img: ElementRef<'_>) -> Option<String> {
    let attrs = img.value();
    ["data-src", "src"]
        .iter()
        .filter_map(|a| attrs.attr(a))
        .map(str::trim)
        .find(|v| !v.is_empty() && !v.starts_with("data:"))
        .map(|v| v.to_string())
}

/// Loading spinners and placeholders are not chapter content
pub fn is_content_image(url: &str) -> bool {
    let l = url.to_lowercase();
    !l.contains("loading") && !l.contains("placeholder")
}

fn size_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"-\d+x\d+(\.[A-Za-z0-9]+)((?:\?.*)?)$").expect("static regex")
    })
}

/// Drop a WordPress resize suffix (`cover-225x320.jpg` -> `cover.jpg`)
pub fn strip_size_suffix(url: &str) -> String {
    size_suffix_re().replace(url, "$1$2").into_owned()
}

/// Last non-empty path segment of a link, ignoring query, fragment and
/// trailing slash. Stable for a given link.
pub fn slug_from_link(link: &str) -> String {
    let no_fragment = link.split('#').next().unwrap_or("");
    let no_query = no_fragment.split('?').next().unwrap_or("");
    let path = match no_query.find("://") {
        Some(i) => {
            let rest = &no_query[i + 3..];
            rest.find('/').map(|j| &rest[j..]).unwrap_or("")
        }
        None => no_query,
    };
    path.split('/')
        .filter(|s| !s.trim().is_empty())
        .last()
        .unwrap_or("")
        .to_string()
}

/// Slug of a navigation href; `#`, empty or javascript links mean "none"
pub fn nav_id(href: Option<&str>) -> Option<String> {
    let h = href?.trim();
    if h.is_empty() || h == "#" || h.starts_with("javascript:") {
        return None;
    }
    let slug = slug_from_link(h);
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Resolve a possibly relative URL against a base
pub fn absolutize(base: &str, href: &str) -> String {
    let h = href.trim();
    if h.starts_with("http://") || h.starts_with("https://") {
        return h.to_string();
    }
    if let Some(rest) = h.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match Url::parse(base).and_then(|b| b.join(h)) {
        Ok(u) => u.to_string(),
        Err(_) => h.to_string(),
    }
}
