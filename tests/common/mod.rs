//! In-memory transport for integration tests: canned responses keyed by
//! exact URL, with every request recorded.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use komik_gateway::error::{NetworkErrorKind, SourceError};
use komik_gateway::http_client::{FetchRequest, FetchResponse, Fetcher};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Clone)]
pub enum Canned {
    Body {
        content_type: Option<String>,
        body: Bytes,
    },
    Status(u16),
    Network(NetworkErrorKind),
}

#[derive(Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, Canned>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, url: &str, canned: Canned) -> &Self {
        self.responses.lock().unwrap().insert(url.to_string(), canned);
        self
    }

    pub fn json(&self, url: &str, value: serde_json::Value) -> &Self {
        self.on(
            url,
            Canned::Body {
                content_type: Some("application/json".into()),
                body: Bytes::from(value.to_string()),
            },
        )
    }

    pub fn html(&self, url: &str, html: &str) -> &Self {
        self.on(
            url,
            Canned::Body {
                content_type: Some("text/html; charset=UTF-8".into()),
                body: Bytes::from(html.to_string()),
            },
        )
    }

    pub fn status(&self, url: &str, status: u16) -> &Self {
        self.on(url, Canned::Status(status))
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.url).collect()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, req: FetchRequest) -> Result<FetchResponse, SourceError> {
        let url = req.url.clone();
        self.requests.lock().unwrap().push(req);
        let canned = self.responses.lock().unwrap().get(&url).cloned();
        match canned {
            Some(Canned::Body { content_type, body }) => Ok(FetchResponse {
                status: 200,
                content_type,
                body,
            }),
            Some(Canned::Status(status)) => Err(SourceError::http(status, &url)),
            Some(Canned::Network(kind)) => Err(SourceError::Network { kind, url }),
            None => Err(SourceError::http(404, &url)),
        }
    }
}

pub const SHINIGAMI_API: &str = "https://api.shngm.io/v1";
pub const SHINIGAMI_CDN: &str = "https://storage.shngm.id";
pub const KIRYUU: &str = "https://kiryuu.org";
pub const KOMIKCAST: &str = "https://komikcast.cz";
