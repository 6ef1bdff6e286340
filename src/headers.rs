//! Browser-like request headers per source.
//!
//! Sources block obvious bots, so every request carries a rotated desktop
//! user agent and a referer pointing at the source's own site.

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// User agents to rotate through to avoid bot detection
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const ACCEPT_JSON: &str = "application/json, text/plain, */*";
const ACCEPT_IMAGE: &str = "image/avif,image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "id-ID,id;q=0.9,en-US;q=0.8,en;q=0.7";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptKind {
    Html,
    Json,
    Image,
}

/// What a request needs to look like for one source
#[derive(Debug, Clone)]
pub struct HeaderProfile<'a> {
    pub site_base: &'a str,
    pub accept: AcceptKind,
    /// Send `Origin` as well (API sources check it)
    pub send_origin: bool,
    /// Header name that gets a fresh random token on every request
    pub anti_bot_header: Option<&'a str>,
}

impl<'a> HeaderProfile<'a> {
    pub fn html(site_base: &'a str) -> Self {
        Self {
            site_base,
            accept: AcceptKind::Html,
            send_origin: false,
            anti_bot_header: None,
        }
    }

    pub fn json(site_base: &'a str) -> Self {
        Self {
            site_base,
            accept: AcceptKind::Json,
            send_origin: true,
            anti_bot_header: None,
        }
    }

    pub fn image(site_base: &'a str) -> Self {
        Self {
            site_base,
            accept: AcceptKind::Image,
            send_origin: false,
            anti_bot_header: None,
        }
    }

    pub fn with_anti_bot(mut self, header: Option<&'a str>) -> Self {
        self.anti_bot_header = header;
        self
    }
}

/// Get a random user agent from the pool
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
}

/// Short lowercase hex token. Low entropy on purpose: the upstream check only
/// wants the header to vary between requests.
pub fn random_token(len: usize) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

pub fn build_headers(profile: &HeaderProfile<'_>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let base = profile.site_base.trim_end_matches('/');

    let accept = match profile.accept {
        AcceptKind::Html => ACCEPT_HTML,
        AcceptKind::Json => ACCEPT_JSON,
        AcceptKind::Image => ACCEPT_IMAGE,
    };
    headers.insert(
        reqwest::header::USER_AGENT,
        HeaderValue::from_static(random_user_agent()),
    );
    headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static(accept));
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(ACCEPT_LANGUAGE),
    );
    headers.insert(reqwest::header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(reqwest::header::PRAGMA, HeaderValue::from_static("no-cache"));

    if !base.is_empty() {
        match HeaderValue::from_str(&format!("{}/", base)) {
            Ok(v) => {
                headers.insert(reqwest::header::REFERER, v);
            }
            Err(_) => log::debug!("Skipping invalid referer for {}", base),
        }
        if profile.send_origin {
            if let Ok(v) = HeaderValue::from_str(base) {
                headers.insert(reqwest::header::ORIGIN, v);
            }
        }
    }

    if let Some(name) = profile.anti_bot_header {
        if let (Ok(n), Ok(v)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&random_token(8)),
        ) {
            headers.insert(n, v);
        }
    }

    headers
}
