use crate::error::{NetworkErrorKind, SourceError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One outbound GET
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HeaderMap::new(),
            accept_invalid_certs: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn accept_invalid_certs(mut self, yes: bool) -> Self {
        self.accept_invalid_certs = yes;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A successful (2xx) upstream response
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, SourceError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Transport seam used by every adapter and the image proxy.
///
/// Implementations must turn non-2xx statuses into [`SourceError::Http`] and
/// transport failures into [`SourceError::Network`]. Nothing is retried.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, SourceError>;
}

/// Configuration for the reqwest-backed fetcher
#[derive(Clone, Debug)]
pub struct HttpClientConfig {
    pub enable_gzip: bool,
    pub max_redirects: usize,
    pub pool_idle_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            enable_gzip: true,
            max_redirects: 10,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

/// reqwest fetcher holding a strict and a certificate-relaxed client
pub struct HttpFetcher {
    strict: Client,
    relaxed: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let strict = Self::builder(&config).build()?;
        // Some sources serve self-signed or expired certificates
        let relaxed = Self::builder(&config)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { strict, relaxed })
    }

    fn builder(config: &HttpClientConfig) -> ClientBuilder {
        ClientBuilder::new()
            .gzip(config.enable_gzip)
            .brotli(config.enable_gzip)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(config.pool_idle_timeout))
    }

    fn client_for(&self, req: &FetchRequest) -> &Client {
        if req.accept_invalid_certs {
            &self.relaxed
        } else {
            &self.strict
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, SourceError> {
        log::debug!("GET {}", req.url);
        let response = self
            .client_for(&req)
            .get(&req.url)
            .headers(req.headers.clone())
            .timeout(req.timeout)
            .send()
            .await
            .map_err(|e| network_error(&e, &req.url))?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Upstream {} for {}", status, req.url);
            return Err(SourceError::http(status.as_u16(), &req.url));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| network_error(&e, &req.url))?;

        Ok(FetchResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

/// Flatten an error and its sources into one message
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![e.to_string()];
    let mut cur = e.source();
    while let Some(inner) = cur {
        parts.push(inner.to_string());
        cur = inner.source();
    }
    parts.join(": ")
}

fn network_error(e: &reqwest::Error, url: &str) -> SourceError {
    let chain = error_chain(e);
    let kind = NetworkErrorKind::classify(e.is_timeout(), e.is_connect(), &chain);
    log::warn!("Network error ({:?}) for {}: {}", kind, url, chain);
    SourceError::Network {
        kind,
        url: url.to_string(),
    }
}
