mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use bytes::Bytes;
use common::{Canned, MockFetcher, KIRYUU, SHINIGAMI_API};
use komik_gateway::app_state::AppState;
use komik_gateway::config::Config;
use komik_gateway::error::NetworkErrorKind;
use komik_gateway::routes;
use serde_json::{json, Value};
use std::sync::Arc;

const LIST_URL: &str =
    "https://api.shngm.io/v1/manga/list?page=1&page_size=24&sort=latest&sort_order=desc";

fn chapters_url(manga_id: &str) -> String {
    format!(
        "{}/chapter/{}/list?page=1&page_size=9999&sort_by=chapter_number&sort_order=desc",
        SHINIGAMI_API, manga_id
    )
}

fn state(mock: &Arc<MockFetcher>) -> web::Data<AppState> {
    let mut cfg = Config::default();
    cfg.updates.delay_ms = 0;
    web::Data::new(AppState::new(cfg, mock.clone()))
}

macro_rules! app {
    ($data:expr) => {
        test::init_service(
            App::new()
                .app_data($data.clone())
                .configure(routes::configure)
                .default_service(web::to(routes::not_found)),
        )
        .await
    };
}

fn manga_json() -> Value {
    json!({
        "manga_id": "abc",
        "title": "Solo Leveling",
        "status": 2,
        "cover_image_url": "covers/solo.jpg",
        "taxonomy": {"Genre": [{"name": "Action"}], "Author": [{"name": "Chugong"}]}
    })
}

#[actix_web::test]
async fn test_health() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"success": true, "status": "ok"}));
}

#[actix_web::test]
async fn test_sources_listing() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);
    let req = test::TestRequest::get().uri("/sources").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["shinigami", "kiryuu", "komikcast", "bacakomik"]);
    assert_eq!(body["data"][0]["kind"], "api");
    assert_eq!(body["data"][1]["baseUrl"], KIRYUU);
}

#[actix_web::test]
async fn test_blank_search_never_touches_network() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    for uri in ["/search?q=%20%20%20", "/search", "/sources/kiryuu?q=", "/sources/shinigami?q=%09"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().len() > 0);
    }
    assert_eq!(mock.calls(), 0);
}

#[actix_web::test]
async fn test_unknown_source_and_route() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/sources/nope").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("nope"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/nowhere").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_api_listing_is_normalized_and_cached() {
    let mock = Arc::new(MockFetcher::new());
    mock.json(
        LIST_URL,
        json!({"retcode": 0, "data": [manga_json(), {"manga_id": "", "title": ""}]}),
    );
    let data = state(&mock);
    let app = app!(data);

    for _ in 0..2 {
        let req = test::TestRequest::get().uri("/sources/shinigami").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["source"], "shinigami");
        assert_eq!(body["page"], 1);
        assert_eq!(body["count"], 1);
        let m = &body["data"][0];
        assert_eq!(m["id"], "abc");
        assert_eq!(m["status"], "Completed");
        assert_eq!(m["genres"], json!(["Action"]));
        assert_eq!(m["cover"], "https://storage.shngm.id/covers/solo.jpg");
        assert_eq!(m["link"], "https://id.shinigami.asia/series/abc");
    }
    assert_eq!(mock.calls(), 1);
}

#[actix_web::test]
async fn test_source_search_uses_plus_separator() {
    let mock = Arc::new(MockFetcher::new());
    let url = format!("{}&q=solo+leveling", LIST_URL);
    mock.json(&url, json!({"data": [manga_json()]}));
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get()
        .uri("/sources/shinigami?q=%20solo%20%20leveling%20")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["count"], 1);
    assert_eq!(mock.urls(), vec![url]);
}

#[actix_web::test]
async fn test_search_route_uses_aggregator_source() {
    let mock = Arc::new(MockFetcher::new());
    let url = format!("{}&q=solo", LIST_URL);
    mock.json(&url, json!({"data": [manga_json()]}));
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get().uri("/search?q=solo").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "shinigami");
    assert_eq!(body["data"][0]["title"], "Solo Leveling");
}

#[actix_web::test]
async fn test_detail_survives_chapter_list_failure() {
    let mock = Arc::new(MockFetcher::new());
    mock.json(&format!("{}/manga/detail/abc", SHINIGAMI_API), json!({"data": manga_json()}));
    mock.status(&chapters_url("abc"), 500);
    let data = state(&mock);
    let app = app!(data);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/sources/shinigami/abc").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["title"], "Solo Leveling");
    assert_eq!(body["data"]["authors"], json!(["Chugong"]));
    assert_eq!(body["data"]["chapters"], json!([]));
    assert_eq!(body["data"]["totalChapters"], 0);
}

#[actix_web::test]
async fn test_chapter_backfill_failure_keeps_unknown_title() {
    let mock = Arc::new(MockFetcher::new());
    mock.json(
        &format!("{}/chapter/detail/c1", SHINIGAMI_API),
        json!({"data": {
            "chapter_id": "c1",
            "manga_id": "abc",
            "chapter_number": 3,
            "next_chapter_id": "c2",
            "chapter": {"path": "/chapter/abc/c1/", "data": ["1.jpg", "2.jpg"]}
        }}),
    );
    mock.status(&format!("{}/manga/detail/abc", SHINIGAMI_API), 500);
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get().uri("/sources/shinigami/chapter/c1").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["chapter"]["mangaTitle"], "Unknown");
    assert_eq!(body["chapter"]["mangaCover"], "");
    assert_eq!(body["chapter"]["nextChapterId"], "c2");
    assert_eq!(body["chapter"]["prevChapterId"], Value::Null);
    assert_eq!(body["chapter"]["totalPages"], 2);
    // API pages start at 1
    assert_eq!(body["pages"][0], json!({"index": 1, "url": "https://storage.shngm.id/chapter/abc/c1/1.jpg"}));
    assert_eq!(mock.calls(), 2);
}

#[actix_web::test]
async fn test_upstream_failure_is_500_envelope_and_counted() {
    let mock = Arc::new(MockFetcher::new());
    mock.status(LIST_URL, 503);
    mock.on(
        &format!("{}/manga/detail/slow", SHINIGAMI_API),
        Canned::Network(NetworkErrorKind::Timeout),
    );
    let data = state(&mock);
    let app = app!(data);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/sources/shinigami").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("503"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/sources/shinigami/slow").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // failures are not cached
    let resp = test::call_service(&app, test::TestRequest::get().uri("/sources/shinigami").to_request()).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(mock.calls(), 3);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"][0]["sourceName"], "shinigami");
    assert_eq!(body["data"][0]["failedRequests"], 3);
    assert_eq!(body["data"][0]["timeoutCount"], 1);
    assert_eq!(body["summary"]["failedRequests"], 3);
}

#[actix_web::test]
async fn test_featured_failure_is_soft() {
    let mock = Arc::new(MockFetcher::new());
    mock.status(&format!("{}/", KIRYUU), 502);
    let data = state(&mock);
    let app = app!(data);

    for uri in ["/featured/kiryuu", "/featured/nope"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], json!([]));
    }
}

#[actix_web::test]
async fn test_featured_scrape() {
    let mock = Arc::new(MockFetcher::new());
    mock.html(
        &format!("{}/", KIRYUU),
        r#"<div class="hotslid"><div class="bs"><div class="bsx">
            <a href="https://kiryuu.org/manga/solo-leveling/" title="Solo Leveling"><img src="https://i0.wp.com/kiryuu.org/wp-content/uploads/solo.jpg?resize=165,225"><div class="tt">Solo Leveling</div></a>
        </div></div></div>"#,
    );
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get().uri("/featured/kiryuu").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["source"], "kiryuu");
    assert_eq!(body["data"][0]["id"], "solo-leveling");
    assert_eq!(body["data"][0]["cover"], "https://kiryuu.org/wp-content/uploads/solo.jpg");
    assert!(mock.requests()[0].accept_invalid_certs);
}

#[actix_web::test]
async fn test_scrape_chapter_pages_are_zero_based() {
    let mock = Arc::new(MockFetcher::new());
    mock.html(
        &format!("{}/solo-leveling-chapter-2/", KIRYUU),
        r##"<h1 class="entry-title">Solo Leveling Chapter 2</h1>
           <div class="allc"><a href="https://kiryuu.org/manga/solo-leveling/">Solo Leveling</a></div>
           <div id="readerarea"><img src="https://cdn.kiryuu.org/2/01.jpg"><img src="https://cdn.kiryuu.org/2/02.jpg"></div>
           <a class="ch-prev-a" href="https://kiryuu.org/solo-leveling-chapter-1/">Prev</a>
           <a class="ch-next-a" href="#/next/">Next</a>"##,
    );
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get()
        .uri("/sources/kiryuu/chapter/solo-leveling-chapter-2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["pages"][0]["index"], 0);
    assert_eq!(body["pages"][1]["index"], 1);
    assert_eq!(body["chapter"]["mangaId"], "solo-leveling");
    assert_eq!(body["chapter"]["prevChapterId"], "solo-leveling-chapter-1");
}

#[actix_web::test]
async fn test_madara_chapter_requires_manga_param() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/sources/bacakomik/chapter/chapter-1").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(mock.calls(), 0);
}

#[actix_web::test]
async fn test_image_proxy_validation() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    for uri in ["/image-proxy", "/image-proxy?url=", "/image-proxy?url=ftp%3A%2F%2Fx%2Fa.png", "/image-proxy?url=not-a-url"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
    assert_eq!(mock.calls(), 0);
}

#[actix_web::test]
async fn test_image_proxy_streams_with_source_referer() {
    let mock = Arc::new(MockFetcher::new());
    let image = "https://kiryuu.org/wp-content/uploads/a.webp";
    mock.on(
        image,
        Canned::Body {
            content_type: Some("application/octet-stream".into()),
            body: Bytes::from_static(b"RIFF0000WEBP"),
        },
    );
    mock.on(
        "https://img.other.test/b.jpg",
        Canned::Body {
            content_type: Some("image/png".into()),
            body: Bytes::from_static(b"\x89PNG"),
        },
    );
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get()
        .uri("/image-proxy?url=https%3A%2F%2Fkiryuu.org%2Fwp-content%2Fuploads%2Fa.webp")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/webp");
    assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "public, max-age=86400");
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"RIFF0000WEBP");

    let sent = &mock.requests()[0];
    assert_eq!(sent.headers.get("referer").unwrap(), "https://kiryuu.org/");
    assert!(sent.accept_invalid_certs);

    // upstream image/* header wins over the extension; unknown hosts use their own origin
    let req = test::TestRequest::get()
        .uri("/image-proxy?url=https%3A%2F%2Fimg.other.test%2Fb.jpg")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    let sent = &mock.requests()[1];
    assert_eq!(sent.headers.get("referer").unwrap(), "https://img.other.test/");
    assert!(!sent.accept_invalid_certs);
}

#[actix_web::test]
async fn test_image_proxy_upstream_failure_is_502() {
    let mock = Arc::new(MockFetcher::new());
    mock.on(
        "https://storage.shngm.id/covers/x.jpg",
        Canned::Network(NetworkErrorKind::ConnectionRefused),
    );
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::get()
        .uri("/image-proxy?url=https%3A%2F%2Fstorage.shngm.id%2Fcovers%2Fx.jpg")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(
        mock.requests()[0].headers.get("referer").unwrap(),
        "https://id.shinigami.asia/"
    );
}

#[actix_web::test]
async fn test_update_check() {
    let mock = Arc::new(MockFetcher::new());
    mock.json(&format!("{}/manga/detail/abc", SHINIGAMI_API), json!({"data": manga_json()}));
    mock.json(
        &chapters_url("abc"),
        json!({"data": [
            {"chapter_id": "c12", "chapter_number": 12},
            {"chapter_id": "c11", "chapter_number": "11.5"}
        ]}),
    );
    let data = state(&mock);
    let app = app!(data);

    let req = test::TestRequest::post()
        .uri("/updates/check")
        .set_json(json!({"items": [
            {"source": "shinigami", "mangaId": "abc", "lastReadChapter": 10},
            {"source": "shinigami", "mangaId": "abc", "lastReadChapter": 12},
            {"source": "nope", "mangaId": "x", "lastReadChapter": 1}
        ]}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["hasUpdate"], true);
    assert_eq!(results[0]["latestChapter"], 12.0);
    assert_eq!(results[1]["hasUpdate"], false);
    assert_eq!(results[2]["hasUpdate"], false);
    assert!(results[2]["error"].as_str().unwrap().contains("nope"));
}

#[actix_web::test]
async fn test_update_check_rejects_bad_input() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    let items: Vec<Value> = (0..51)
        .map(|i| json!({"source": "shinigami", "mangaId": format!("m{}", i), "lastReadChapter": 1}))
        .collect();
    let req = test::TestRequest::post()
        .uri("/updates/check")
        .set_json(json!({ "items": items }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/updates/check")
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(mock.calls(), 0);
}

#[actix_web::test]
async fn test_bad_query_value_is_envelope() {
    let mock = Arc::new(MockFetcher::new());
    let data = state(&mock);
    let app = app!(data);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/sources/shinigami?page=abc").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
}
