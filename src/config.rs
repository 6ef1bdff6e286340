use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const CONFIG_ENV: &str = "KOMIK_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub updates: UpdatesConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Timeout for JSON API sources in seconds
    #[serde(default = "default_api_timeout")]
    pub api_timeout_secs: u64,

    /// Timeout for HTML-scraped sources in seconds
    #[serde(default = "default_scrape_timeout")]
    pub scrape_timeout_secs: u64,

    /// Timeout for image proxy fetches in seconds
    #[serde(default = "default_proxy_timeout")]
    pub proxy_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub enable_compression: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
    #[serde(default = "default_list_ttl")]
    pub list_ttl_secs: u64,
    #[serde(default = "default_detail_ttl")]
    pub detail_ttl_secs: u64,
    #[serde(default = "default_chapter_ttl")]
    pub chapter_ttl_secs: u64,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_featured_ttl")]
    pub featured_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpdatesConfig {
    /// Fixed pause between two upstream calls of one update check
    #[serde(default = "default_update_delay")]
    pub delay_ms: u64,
    #[serde(default = "default_update_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourcesConfig {
    /// Source that backs `/search`
    #[serde(default = "default_search_source")]
    pub search_source: String,
    #[serde(default = "default_shinigami")]
    pub shinigami: ApiSourceConfig,
    #[serde(default = "default_kiryuu")]
    pub kiryuu: SiteConfig,
    #[serde(default = "default_komikcast")]
    pub komikcast: SiteConfig,
    #[serde(default = "default_bacakomik")]
    pub bacakomik: SiteConfig,
}

/// Endpoints of a JSON API source
#[derive(Debug, Deserialize, Clone)]
pub struct ApiSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub api_base: String,
    pub cdn_base: String,
    pub site_base: String,
    #[serde(default = "default_chapter_page_size")]
    pub chapter_page_size: u32,
}

/// Location of an HTML-scraped site
#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub base_url: String,
}

fn default_true() -> bool { true }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_api_timeout() -> u64 { 30 }
fn default_scrape_timeout() -> u64 { 20 }
fn default_proxy_timeout() -> u64 { 30 }
fn default_cache_capacity() -> usize { 512 }
fn default_list_ttl() -> u64 { 300 }
fn default_detail_ttl() -> u64 { 600 }
fn default_chapter_ttl() -> u64 { 3600 }
fn default_search_ttl() -> u64 { 60 }
fn default_featured_ttl() -> u64 { 900 }
fn default_update_delay() -> u64 { 1500 }
fn default_update_max_items() -> usize { 50 }
fn default_chapter_page_size() -> u32 { 9999 }
fn default_search_source() -> String { "shinigami".to_string() }

fn default_shinigami() -> ApiSourceConfig {
    ApiSourceConfig {
        enabled: true,
        api_base: "https://api.shngm.io/v1".to_string(),
        cdn_base: "https://storage.shngm.id".to_string(),
        site_base: "https://id.shinigami.asia".to_string(),
        chapter_page_size: default_chapter_page_size(),
    }
}

fn default_kiryuu() -> SiteConfig {
    SiteConfig { enabled: true, base_url: "https://kiryuu.org".to_string() }
}

fn default_komikcast() -> SiteConfig {
    SiteConfig { enabled: true, base_url: "https://komikcast.cz".to_string() }
}

fn default_bacakomik() -> SiteConfig {
    SiteConfig { enabled: true, base_url: "https://bacakomik.one".to_string() }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_timeout_secs: default_api_timeout(),
            scrape_timeout_secs: default_scrape_timeout(),
            proxy_timeout_secs: default_proxy_timeout(),
            enable_compression: true,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: default_cache_capacity(),
            list_ttl_secs: default_list_ttl(),
            detail_ttl_secs: default_detail_ttl(),
            chapter_ttl_secs: default_chapter_ttl(),
            search_ttl_secs: default_search_ttl(),
            featured_ttl_secs: default_featured_ttl(),
        }
    }
}

impl Default for UpdatesConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_update_delay(),
            max_items: default_update_max_items(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            search_source: default_search_source(),
            shinigami: default_shinigami(),
            kiryuu: default_kiryuu(),
            komikcast: default_komikcast(),
            bacakomik: default_bacakomik(),
        }
    }
}

impl Config {
    /// Load `config.toml` (or the file named by `KOMIK_CONFIG`), falling back
    /// to defaults when it is missing or invalid.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        if !Path::new(&path).exists() {
            log::info!("No config file at {}, using defaults", path);
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<Config>(content)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
