//! Komikcast: own theme, rejects requests without a token header.

use super::scrape::SiteProfile;
use super::themes::KOMIKCAST;

pub const NAME: &str = "komikcast";

/// Header the site expects a fresh random token in
pub const TOKEN_HEADER: &str = "X-Requested-Token";

/// Force https and drop the CDN quality query
pub fn fix_cover(url: &str) -> String {
    let url = match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    };
    match url.split_once('?') {
        Some((path, query)) if query.contains("quality=") => path.to_string(),
        _ => url,
    }
}

pub fn profile(base_url: &str) -> SiteProfile {
    SiteProfile {
        name: NAME,
        base_url: base_url.to_string(),
        theme: &KOMIKCAST,
        accept_invalid_certs: false,
        anti_bot_header: Some(TOKEN_HEADER),
        cover_fixup: fix_cover,
    }
}
