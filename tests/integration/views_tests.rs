//! List and detail view tests.

use axum::http::StatusCode;

use super::test_utils::{body_json, body_text, generate, get, location, login, send, test_app};

#[tokio::test]
async fn test_empty_tracklist_redirects_home() {
    let (router, _) = test_app().await;
    let cookie = login(&router).await;

    let response = send(&router, get("/tracklist", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let page = body_text(send(&router, get("/", Some(&cookie))).await).await;
    assert!(page.contains("Sorry, No tracking records found! - Let's generate a one!"));
}

#[tokio::test]
async fn test_tracklist_shows_every_record() {
    let (router, _) = test_app().await;
    let cookie = login(&router).await;
    let first = generate(&router, &cookie, "Newsletter").await;
    let second = generate(&router, &cookie, "").await;

    let response = send(&router, get("/tracklist", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    let records = list["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);

    let ids: Vec<&str> = records.iter().map(|r| r["id"].as_str().unwrap()).collect();
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
    for record in records {
        let id = record["id"].as_str().unwrap();
        assert_eq!(
            record["pixelUrl"],
            format!("http://localhost:8080/track?utm_id={id}").as_str()
        );
    }
}

#[tokio::test]
async fn test_unknown_detail_redirects_to_list() {
    let (router, _) = test_app().await;
    let cookie = login(&router).await;
    generate(&router, &cookie, "Known").await;

    let response = send(&router, get("/tracking-data/does-not-exist", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/tracklist");

    let list = body_json(send(&router, get("/tracklist", Some(&cookie))).await).await;
    let notices = list["notices"].as_array().unwrap();
    assert!(notices.contains(&"Sorry, Not a valid UTM id!".into()));
}
