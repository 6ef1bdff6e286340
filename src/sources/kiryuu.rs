//! Kiryuu: MangaThemesia site with a broken certificate chain. Covers are
//! often served through the Jetpack image proxy.

use super::scrape::SiteProfile;
use super::themes::MANGATHEMESIA;
use regex::Regex;
use std::sync::OnceLock;

pub const NAME: &str = "kiryuu";

fn wp_proxy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://i\d+\.wp\.com/").expect("static regex"))
}

/// Unwrap `i0.wp.com/<host>/...` proxy URLs and drop their resize query
pub fn fix_cover(url: &str) -> String {
    if !wp_proxy_re().is_match(url) {
        return url.to_string();
    }
    let direct = wp_proxy_re().replace(url, "https://");
    direct.split('?').next().unwrap_or_default().to_string()
}

pub fn profile(base_url: &str) -> SiteProfile {
    SiteProfile {
        name: NAME,
        base_url: base_url.to_string(),
        theme: &MANGATHEMESIA,
        accept_invalid_certs: true,
        anti_bot_header: None,
        cover_fixup: fix_cover,
    }
}
