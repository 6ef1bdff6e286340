//! Error taxonomy shared by the transport, the adapters and the HTTP surface.
//!
//! Adapters return [`SourceError`]; handlers wrap it in [`ApiError`] which
//! renders the uniform `{success:false, error}` envelope. Upstream HTTP
//! statuses are reported in the message but never proxied as the response
//! status.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a transport-level failure (no HTTP response was received)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NetworkErrorKind {
    Dns,
    ConnectionRefused,
    Timeout,
    Tls,
    Connect,
    Other,
}

impl NetworkErrorKind {
    /// Classify a transport failure from the client's flags and the flattened
    /// error chain message.
    pub fn classify(is_timeout: bool, is_connect: bool, message: &str) -> Self {
        let m = message.to_lowercase();
        if is_timeout || m.contains("timed out") || m.contains("timeout") {
            return NetworkErrorKind::Timeout;
        }
        if m.contains("dns")
            || m.contains("failed to lookup")
            || m.contains("name or service not known")
            || m.contains("no such host")
            || m.contains("nodename nor servname")
        {
            return NetworkErrorKind::Dns;
        }
        if m.contains("connection refused") {
            return NetworkErrorKind::ConnectionRefused;
        }
        if m.contains("certificate") || m.contains("tls") || m.contains("ssl") {
            return NetworkErrorKind::Tls;
        }
        if is_connect {
            return NetworkErrorKind::Connect;
        }
        NetworkErrorKind::Other
    }

    pub fn message(&self) -> &'static str {
        match self {
            NetworkErrorKind::Dns => "Could not resolve the source host (DNS failure)",
            NetworkErrorKind::ConnectionRefused => "The source refused the connection",
            NetworkErrorKind::Timeout => "The source did not respond in time (timeout)",
            NetworkErrorKind::Tls => "Secure connection to the source failed (TLS)",
            NetworkErrorKind::Connect => "Could not connect to the source",
            NetworkErrorKind::Other => "Request to the source failed",
        }
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{kind}: {url}")]
    Network { kind: NetworkErrorKind, url: String },

    #[error("Upstream responded {status} {reason}: {url}")]
    Http {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl SourceError {
    pub fn http(status: u16, url: &str) -> Self {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown Status")
            .to_string();
        SourceError::Http {
            status,
            reason,
            url: url.to_string(),
        }
    }

    /// Upstream status carried by the error, if any
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            SourceError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            SourceError::Network {
                kind: NetworkErrorKind::Timeout,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// `{success:false, error}` body shared by every failing endpoint
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Handler-facing error; renders as an [`ErrorEnvelope`]
#[derive(Debug)]
pub struct ApiError(pub SourceError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SourceError> for ApiError {
    fn from(e: SourceError) -> Self {
        ApiError(e)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            SourceError::Validation(_) => StatusCode::BAD_REQUEST,
            SourceError::UnknownSource(_) | SourceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorEnvelope::new(self.0.to_string()))
    }
}
