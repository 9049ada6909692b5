//! Helpers for driving the router in tests.

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use mail_tracker::{create_router, AppState, MemoryStore, Passwords, ServiceSettings};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "correct horse battery staple";

/// Router backed by a fresh in-memory store with one account.
pub async fn test_app() -> (Router, MemoryStore) {
    test_app_with(ServiceSettings::default()).await
}

pub async fn test_app_with(settings: ServiceSettings) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let passwords = Passwords::new(Params::new(8, 1, 1, None).unwrap());
    let state = AppState::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        passwords,
        settings,
    );
    state
        .authenticator
        .ensure_account(USERNAME, PASSWORD)
        .await
        .unwrap();
    (create_router(state), store)
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Pixel request as a mail client would send it.
pub fn fetch_pixel(utm_id: &str, user_agent: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(format!("/track?utm_id={utm_id}"))
        .header(header::USER_AGENT, user_agent)
        .header("X-Forwarded-For", "198.51.100.4");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// `name=value` pair of the session cookie set by the response, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with("tracker_session="))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

pub fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Logs in and returns the session cookie.
pub async fn login(router: &Router) -> String {
    let body = format!("username={USERNAME}&password=correct+horse+battery+staple");
    let response = send(router, post_form("/login", &body, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response).expect("login sets a session cookie")
}

/// Generates a record through the form and returns its id.
pub async fn generate(router: &Router, cookie: &str, label: &str) -> String {
    let body = format!("label={}", label.replace(' ', "+"));
    let response = send(router, post_form("/", &body, Some(cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
        .strip_prefix("/tracking-data/")
        .expect("redirects to the detail view")
        .to_string()
}
