//! Reshaping helpers shared by all adapters: search-query cleanup, cover URL
//! normalization, number parsing and output filtering.

use crate::error::SourceError;
use crate::models::MangaSummary;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Separator the upstream search endpoints expect between words
pub const QUERY_SEPARATOR: &str = "+";

/// Trim and collapse whitespace into [`QUERY_SEPARATOR`]. Blank queries are
/// rejected so callers can fail before touching the network.
pub fn normalize_search_query(raw: &str) -> Result<String, SourceError> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() {
        return Err(SourceError::Validation(
            "Search query must not be empty".to_string(),
        ));
    }
    Ok(words.join(QUERY_SEPARATOR))
}

/// Percent-encode each word of a normalized term, keeping the separator literal
pub fn encode_query_term(term: &str) -> String {
    term.split(QUERY_SEPARATOR)
        .map(|w| url::form_urlencoded::byte_serialize(w.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join(QUERY_SEPARATOR)
}

/// Resolve an API cover path against the CDN base. Idempotent: absolute URLs
/// pass through (protocol-relative ones gain `https:`).
pub fn normalize_api_cover(cdn_base: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return raw.to_string();
    }
    if let Some(rest) = raw.strip_prefix("//").filter(|r| !r.starts_with('/')) {
        return format!("https://{}", rest);
    }
    format!(
        "{}/{}",
        cdn_base.trim_end_matches('/'),
        raw.trim_start_matches('/')
    )
}

/// Join URL pieces with exactly one slash between them
pub fn join_url(parts: &[&str]) -> String {
    let mut out = String::new();
    for (i, p) in parts.iter().enumerate() {
        let p = if i == 0 {
            p.trim_end_matches('/')
        } else {
            p.trim_matches('/')
        };
        if p.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(p);
    }
    out
}

fn chapter_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:chapter|chap|ch|episode|ep)[\s.\-_]*(\d+(?:[.,]\d+)?)")
            .expect("static regex")
    })
}

fn any_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:[.,]\d+)?)").expect("static regex"))
}

fn to_f64(s: &str) -> Option<f64> {
    s.replace(',', ".").parse::<f64>().ok()
}

/// Chapter number from a label such as "Chapter 12.5" or a chapter URL.
/// Falls back to the first number anywhere, then 0.
pub fn parse_chapter_number(text: &str) -> f64 {
    chapter_number_re()
        .captures(text)
        .and_then(|c| to_f64(&c[1]))
        .or_else(|| {
            any_number_re()
                .captures(text)
                .and_then(|c| to_f64(&c[1]))
        })
        .unwrap_or(0.0)
}

/// First numeric token of a rating label ("Rating 8.50" -> 8.5)
pub fn parse_rating(text: &str) -> Option<f64> {
    any_number_re()
        .captures(text)
        .and_then(|c| to_f64(&c[1]))
}

/// Drop invalid records and repeated ids, keeping first occurrence
pub fn finalize_list(items: Vec<MangaSummary>) -> Vec<MangaSummary> {
    let mut seen: HashSet<String> = HashSet::new();
    items
        .into_iter()
        .filter(|m| m.is_valid())
        .filter(|m| m.id.is_empty() || seen.insert(m.id.clone()))
        .collect()
}

/// Navigation labels picked up by the generic container sweep
const NAV_LABELS: &[&str] = &[
    "next", "prev", "previous", "home", "menu", "search", "login", "register",
    "selanjutnya", "sebelumnya", "beranda", "daftar komik",
];

fn title_noise_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:\s+(?:chapter|ch\.?)\s*\d+(?:[.,]\d+)?|\s+\d+\.\d+)\s*$")
            .expect("static regex")
    })
}

/// Strip badges, trailing "Chapter N" and trailing decimal ratings from a
/// title scraped out of a loosely matched container. `badges` are the texts
/// of badge elements found in that container; only those are stripped from
/// the front, so titles like "Manga Dogs" survive. `None` when what is left
/// does not look like a title.
pub fn clean_title(raw: &str, badges: &[String]) -> Option<String> {
    let mut cleaned = crate::extract::clean_text(raw);
    // each badge element accounts for one leading word at most
    let mut pending: Vec<String> = badges
        .iter()
        .map(|b| crate::extract::clean_text(b).to_lowercase())
        .filter(|b| !b.is_empty())
        .collect();
    loop {
        let lower = cleaned.to_lowercase();
        let Some(pos) = pending
            .iter()
            .position(|b| lower.starts_with(&format!("{} ", b)))
        else {
            break;
        };
        let badge = pending.remove(pos);
        match cleaned.get(badge.len()..) {
            Some(rest) => cleaned = rest.trim().to_string(),
            None => break,
        }
    }
    loop {
        let next = title_noise_re().replace(&cleaned, "").trim().to_string();
        if next == cleaned {
            break;
        }
        cleaned = next;
    }

    if cleaned.chars().count() < 2 || cleaned.chars().all(|c| !c.is_alphanumeric()) {
        return None;
    }
    let lower = cleaned.to_lowercase();
    if NAV_LABELS.contains(&lower.as_str()) || lower.starts_with("chapter ") {
        return None;
    }
    Some(cleaned)
}

/// Split a comma/slash separated credit line into names
pub fn split_names(raw: &str) -> Vec<String> {
    raw.split([',', '/', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && *s != "-")
        .map(|s| s.to_string())
        .collect()
}
