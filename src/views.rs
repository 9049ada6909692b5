use axum::response::Html;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::model::{HitEvent, TrackingRecord};
use crate::state::ServiceSettings;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitView {
    pub source_address: Option<String>,
    pub client_signature: String,
    pub observed_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    pub id: String,
    pub label: String,
    pub created_at: String,
    pub pixel_url: String,
    pub hit_count: usize,
    pub hits: Vec<HitView>,
}

#[derive(Serialize)]
pub struct ListView {
    pub notices: Vec<String>,
    pub records: Vec<RecordView>,
}

#[derive(Serialize)]
pub struct DetailView {
    pub notices: Vec<String>,
    pub record: RecordView,
}

fn format_timestamp(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).to_rfc3339()
}

impl HitView {
    fn new(hit: &HitEvent, offset: FixedOffset) -> Self {
        Self {
            source_address: hit.source_address.clone(),
            client_signature: hit.client_signature.clone(),
            observed_at: format_timestamp(hit.observed_at, offset),
        }
    }
}

impl RecordView {
    pub fn new(record: &TrackingRecord, settings: &ServiceSettings) -> Self {
        let offset = settings.display_offset;
        Self {
            id: record.id.clone(),
            label: record.label.clone(),
            created_at: format_timestamp(record.created_at, offset),
            pixel_url: settings.pixel_url(&record.id),
            hit_count: record.hits.len(),
            hits: record.hits.iter().map(|hit| HitView::new(hit, offset)).collect(),
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, notices: &[String], body: &str) -> Html<String> {
    let notices: String = notices
        .iter()
        .map(|notice| format!("<p class=\"notice\">{}</p>\n", escape(notice)))
        .collect();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>{title}</title>
</head>
<body>
{notices}{body}
</body>
</html>"#
    ))
}

pub fn generator_page(notices: &[String]) -> Html<String> {
    page(
        "Generate tracking link",
        notices,
        r#"<form method="post" action="/">
    <label>Email title <input name="label"></label>
    <button type="submit">Generate</button>
</form>
<a href="/tracklist">All tracking links</a> | <a href="/logout">Log out</a>"#,
    )
}

pub fn login_page(notices: &[String]) -> Html<String> {
    page(
        "Log in",
        notices,
        r#"<form method="post" action="/login">
    <label>Username <input name="username"></label>
    <label>Password <input name="password" type="password"></label>
    <button type="submit">Log in</button>
</form>"#,
    )
}
