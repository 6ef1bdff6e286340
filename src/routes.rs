//! HTTP surface. Every handler answers with a `{success, ...}` envelope;
//! failures go through [`ApiError`] except where noted.

use crate::app_state::AppState;
use crate::cache::{CacheKind, ResponseCache};
use crate::error::{ApiError, ErrorEnvelope, SourceError};
use crate::headers::{build_headers, HeaderProfile};
use crate::http_client::FetchRequest;
use crate::metrics::track_request;
use crate::models::{
    ChapterResponse, DetailResponse, FeaturedResponse, ListQuery, ListResponse,
};
use crate::normalize::normalize_search_query;
use crate::updates::{UpdateChecker, UpdateRequest, UpdateResponse};
use actix_web::http::header;
use actix_web::{error, get, post, web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

type HandlerResult = Result<HttpResponse, ApiError>;

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";
const DEFAULT_IMAGE_TYPE: &str = "image/jpeg";

#[derive(Debug, Deserialize)]
pub struct ChapterQuery {
    pub manga: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

fn cache_key(req: &HttpRequest) -> String {
    ResponseCache::key(req.path(), req.query_string())
}

fn json_body(body: String) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body)
}

fn cached(state: &AppState, key: &str) -> Option<HttpResponse> {
    let body = state.cache.get(key)?;
    log::debug!("Cache hit: {}", key);
    Some(json_body(body))
}

/// Serialize a success envelope, remember it, and send it
fn store<T: Serialize>(state: &AppState, key: String, kind: CacheKind, payload: &T) -> HandlerResult {
    let body = serde_json::to_string(payload).map_err(SourceError::from)?;
    state.cache.insert(key, body.clone(), kind);
    Ok(json_body(body))
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({"success": true, "status": "ok"}))
}

#[get("/sources")]
async fn list_sources(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data.registry.infos(),
    }))
}

/// Catalogue page, or search when `q` is present
#[get("/sources/{source}")]
async fn source_listing(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> HandlerResult {
    let source = data.registry.require(&path)?;
    let term = query.q.as_deref().map(normalize_search_query).transpose()?;

    let key = cache_key(&req);
    if let Some(hit) = cached(&data, &key) {
        return Ok(hit);
    }

    let (items, kind) = match term.as_deref() {
        Some(t) => (
            track_request(&data.metrics, source.name(), source.search(t, &query)).await?,
            CacheKind::Search,
        ),
        None => (
            track_request(&data.metrics, source.name(), source.list(&query)).await?,
            CacheKind::List,
        ),
    };
    let payload = ListResponse {
        success: true,
        source: source.name().to_string(),
        page: query.page(),
        count: items.len(),
        data: items,
    };
    store(&data, key, kind, &payload)
}

#[get("/sources/{source}/chapter/{chapter_id}")]
async fn chapter_pages(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    query: web::Query<ChapterQuery>,
    req: HttpRequest,
) -> HandlerResult {
    let (source_name, chapter_id) = path.into_inner();
    let source = data.registry.require(&source_name)?;

    let key = cache_key(&req);
    if let Some(hit) = cached(&data, &key) {
        return Ok(hit);
    }

    let content = track_request(
        &data.metrics,
        source.name(),
        source.chapter_pages(&chapter_id, query.manga.as_deref()),
    )
    .await?;
    let payload = ChapterResponse {
        success: true,
        chapter: content.chapter_info,
        pages: content.pages,
    };
    store(&data, key, CacheKind::Chapter, &payload)
}

#[get("/sources/{source}/{manga_id}")]
async fn manga_detail(
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    req: HttpRequest,
) -> HandlerResult {
    let (source_name, manga_id) = path.into_inner();
    let source = data.registry.require(&source_name)?;

    let key = cache_key(&req);
    if let Some(hit) = cached(&data, &key) {
        return Ok(hit);
    }

    let detail = track_request(&data.metrics, source.name(), source.detail(&manga_id)).await?;
    store(
        &data,
        key,
        CacheKind::Detail,
        &DetailResponse {
            success: true,
            data: detail,
        },
    )
}

/// Search on the configured aggregator source
#[get("/search")]
async fn search(
    data: web::Data<AppState>,
    query: web::Query<ListQuery>,
    req: HttpRequest,
) -> HandlerResult {
    let raw = query
        .q
        .as_deref()
        .ok_or_else(|| SourceError::Validation("Query parameter q is required".to_string()))?;
    let term = normalize_search_query(raw)?;
    let source = data.registry.require(&data.config.sources.search_source)?;

    let key = cache_key(&req);
    if let Some(hit) = cached(&data, &key) {
        return Ok(hit);
    }

    let items = track_request(&data.metrics, source.name(), source.search(&term, &query)).await?;
    let payload = ListResponse {
        success: true,
        source: source.name().to_string(),
        page: query.page(),
        count: items.len(),
        data: items,
    };
    store(&data, key, CacheKind::Search, &payload)
}

/// Homepage highlights. Never an error status: failures answer
/// `{success:false, data:[]}` so a broken source cannot blank a home screen.
#[get("/featured/{source}")]
async fn featured(data: web::Data<AppState>, path: web::Path<String>, req: HttpRequest) -> HttpResponse {
    let name = path.into_inner();
    let key = cache_key(&req);
    if let Some(hit) = cached(&data, &key) {
        return hit;
    }

    let result = match data.registry.require(&name) {
        Ok(source) => track_request(&data.metrics, source.name(), source.featured()).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(items) => {
            let payload = FeaturedResponse {
                success: true,
                source: name.to_lowercase(),
                data: items,
            };
            match store(&data, key, CacheKind::Featured, &payload) {
                Ok(resp) => resp,
                Err(_) => HttpResponse::Ok().json(payload),
            }
        }
        Err(e) => {
            log::warn!("Featured for {} failed: {}", name, e);
            HttpResponse::Ok().json(FeaturedResponse {
                success: false,
                source: name.to_lowercase(),
                data: Vec::new(),
            })
        }
    }
}

/// Content type from the URL's file extension
pub fn infer_image_type(url: &str) -> &'static str {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or_default().to_string());
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "avif" => "image/avif",
        _ => DEFAULT_IMAGE_TYPE,
    }
}

/// Streams an upstream image with the referer its host expects
#[get("/image-proxy")]
async fn image_proxy(data: web::Data<AppState>, query: web::Query<ProxyQuery>) -> HandlerResult {
    let raw = query
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| SourceError::Validation("Query parameter url is required".to_string()))?;
    let parsed = Url::parse(raw)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .ok_or_else(|| SourceError::Validation("url must be an absolute http(s) URL".to_string()))?;

    let owner = data.registry.by_host(raw);
    let referer_base = match &owner {
        Some(source) => source.base_url().to_string(),
        None => parsed.origin().ascii_serialization(),
    };
    let request = FetchRequest::new(parsed.as_str())
        .headers(build_headers(&HeaderProfile::image(&referer_base)))
        .accept_invalid_certs(owner.as_ref().map(|s| s.accept_invalid_certs()).unwrap_or(false))
        .timeout(Duration::from_secs(data.config.http.proxy_timeout_secs));

    match data.fetcher.fetch(request).await {
        Ok(resp) => {
            let content_type = resp
                .content_type
                .as_deref()
                .filter(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
                .map(|ct| ct.trim().to_string())
                .unwrap_or_else(|| infer_image_type(raw).to_string());
            Ok(HttpResponse::Ok()
                .content_type(content_type)
                .insert_header((header::CACHE_CONTROL, IMAGE_CACHE_CONTROL))
                .body(resp.body))
        }
        Err(e) => {
            log::warn!("Image proxy failed for {}: {}", raw, e);
            Ok(HttpResponse::BadGateway().json(ErrorEnvelope::new(format!("Failed to fetch image: {}", e))))
        }
    }
}

#[post("/updates/check")]
async fn check_updates(data: web::Data<AppState>, body: web::Json<UpdateRequest>) -> HandlerResult {
    let cfg = &data.config.updates;
    let checker = UpdateChecker::new(
        &data.registry,
        &data.metrics,
        Duration::from_millis(cfg.delay_ms),
        cfg.max_items,
    );
    let results = checker.check(&body.items).await?;
    Ok(HttpResponse::Ok().json(UpdateResponse {
        success: true,
        data: results,
    }))
}

#[get("/metrics")]
async fn get_metrics(data: web::Data<AppState>) -> impl Responder {
    let all_metrics = data.metrics.get_all_metrics();

    let metrics_json: Vec<serde_json::Value> = all_metrics
        .iter()
        .map(|m| {
            serde_json::json!({
                "sourceName": m.source_name,
                "successRate": format!("{:.2}%", m.success_rate()),
                "totalRequests": m.total_requests,
                "successfulRequests": m.successful_requests,
                "failedRequests": m.failed_requests,
                "averageResponseTimeMs": format!("{:.2}", m.average_response_time_ms),
                "rateLimitHits": m.rate_limit_hits,
                "timeoutCount": m.timeout_count,
                "networkErrors": m.network_errors,
                "lastSuccess": m.last_success,
                "lastFailure": m.last_failure,
                "lastError": m.last_error,
            })
        })
        .collect();

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "summary": data.metrics.summary(),
        "data": metrics_json,
    }))
}

/// Fallback for unmatched paths
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorEnvelope::new("Route not found"))
}

fn bad_request<E: std::fmt::Debug + std::fmt::Display + 'static>(err: E) -> error::Error {
    let msg = err.to_string();
    error::InternalError::from_response(err, HttpResponse::BadRequest().json(ErrorEnvelope::new(msg))).into()
}

/// Register every route plus envelope-shaped extractor errors
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(web::PathConfig::default().error_handler(|err, _| bad_request(err)))
        .app_data(
            web::JsonConfig::default()
                .limit(256 * 1024)
                .error_handler(|err, _| bad_request(err)),
        )
        .service(health)
        .service(list_sources)
        .service(search)
        .service(image_proxy)
        .service(featured)
        .service(check_updates)
        .service(get_metrics)
        .service(chapter_pages)
        .service(source_listing)
        .service(manga_detail);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_image_type() {
        assert_eq!(infer_image_type("https://x/a.PNG"), "image/png");
        assert_eq!(infer_image_type("https://x/a.jpeg?w=100"), "image/jpeg");
        assert_eq!(infer_image_type("https://x/a.webp#frag"), "image/webp");
        assert_eq!(infer_image_type("https://x/a.avif"), "image/avif");
        assert_eq!(infer_image_type("https://x/a.gif"), "image/gif");
        assert_eq!(infer_image_type("https://x/image"), "image/jpeg");
        assert_eq!(infer_image_type("https://x.y/dir.v2/file"), "image/jpeg");
    }
}
