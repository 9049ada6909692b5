//! Pixel endpoint tests.
//!
//! Tests verify:
//! - Anonymous fetches record exactly one hit each
//! - Logged-in fetches record nothing
//! - Missing, empty and unknown ids all get the same 400

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};

use mail_tracker::pixel::PIXEL_GIF;
use mail_tracker::store::TrackingStore;

use super::test_utils::{
    body_bytes, body_json, body_text, fetch_pixel, generate, get, login, send, test_app,
};

#[tokio::test]
async fn test_campaign_end_to_end() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "Campaign A").await;

    let response = send(&router, get(&format!("/tracking-data/{id}"), Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let detail = body_json(response).await;
    assert_eq!(detail["record"]["id"], id.as_str());
    assert_eq!(detail["record"]["label"], "Campaign A");
    assert_eq!(detail["record"]["hitCount"], 0);
    assert_eq!(detail["notices"][0], "Tracking link successfully generated!");

    let agents = ["Thunderbird/115.0", "Apple Mail (2.3731)", "Outlook-iOS/2.0"];
    for agent in agents {
        let response = send(&router, fetch_pixel(&id, agent, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/gif");
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache, max-age=0");
        assert_eq!(body_bytes(response).await, PIXEL_GIF);
    }

    let response = send(&router, fetch_pixel("nonexistent-id", "Thunderbird/115.0", None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let record = store.get_by_id(&id).await.unwrap().unwrap();
    let signatures: Vec<&str> = record
        .hits
        .iter()
        .map(|hit| hit.client_signature.as_str())
        .collect();
    assert_eq!(signatures, agents);
    assert!(record
        .hits
        .iter()
        .all(|hit| hit.source_address.as_deref() == Some("198.51.100.4")));

    let response = send(&router, get(&format!("/tracking-data/{id}"), Some(&cookie))).await;
    let detail = body_json(response).await;
    assert_eq!(detail["record"]["hitCount"], 3);
    assert_eq!(detail["record"]["hits"][1]["clientSignature"], "Apple Mail (2.3731)");
    assert!(detail["notices"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_logged_in_preview_is_not_counted() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "Preview").await;

    for _ in 0..3 {
        let response = send(&router, fetch_pixel(&id, "Thunderbird/115.0", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, PIXEL_GIF);
    }

    assert!(store.get_by_id(&id).await.unwrap().unwrap().hits.is_empty());
}

#[tokio::test]
async fn test_bad_ids_are_indistinguishable() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "Untouched").await;

    let mut bodies = Vec::new();
    for uri in ["/track", "/track?utm_id=", "/track?utm_id=nonexistent-id"] {
        let response = send(&router, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        bodies.push(body_text(response).await);
    }
    assert!(bodies.iter().all(|body| body == &bodies[0]));
    assert!(store.get_by_id(&id).await.unwrap().unwrap().hits.is_empty());
}

#[tokio::test]
async fn test_fetch_without_user_agent_is_rejected() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "No agent").await;

    let response = send(&router, get(&format!("/track?utm_id={id}"), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.get_by_id(&id).await.unwrap().unwrap().hits.is_empty());
}

#[tokio::test]
async fn test_unknown_session_cookie_counts_as_anonymous() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "Stale cookie").await;

    let stale = "tracker_session=not-a-live-token";
    let response = send(&router, fetch_pixel(&id, "Thunderbird/115.0", Some(stale))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.get_by_id(&id).await.unwrap().unwrap().hits.len(), 1);
}

#[tokio::test]
async fn test_non_ascii_user_agent_is_kept() {
    let (router, store) = test_app().await;
    let cookie = login(&router).await;
    let id = generate(&router, &cookie, "Latin-1 agent").await;

    let request = Request::builder()
        .uri(format!("/track?utm_id={id}"))
        .header(header::USER_AGENT, HeaderValue::from_bytes(b"Mozilla/5.0 (caf\xe9)").unwrap())
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let hits = store.get_by_id(&id).await.unwrap().unwrap().hits;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].client_signature, "Mozilla/5.0 (caf\u{e9})");
    assert_eq!(hits[0].source_address, None);
}
