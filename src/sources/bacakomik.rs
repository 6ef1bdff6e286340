//! Bacakomik: Madara theme. Chapter URLs nest under the manga slug.

use super::scrape::SiteProfile;
use super::themes::MADARA;

pub const NAME: &str = "bacakomik";

pub fn fix_cover(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{}", rest),
        None => url.to_string(),
    }
}

pub fn profile(base_url: &str) -> SiteProfile {
    SiteProfile {
        name: NAME,
        base_url: base_url.to_string(),
        theme: &MADARA,
        accept_invalid_certs: false,
        anti_bot_header: None,
        cover_fixup: fix_cover,
    }
}
