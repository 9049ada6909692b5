use crate::auth::{session_cookie, AuthError, Session};
use crate::error::AppError;
use crate::model::{GenerateForm, LoginForm, PixelQuery};
use crate::pixel::pixel_response;
use crate::state::AppState;
use crate::tracker::{self, PixelServed, RequestContext};
use crate::utils::with_timeout;
use crate::views::{generator_page, login_page, DetailView, ListView, RecordView};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;

pub const GENERATED_NOTICE: &str = "Tracking link successfully generated!";
pub const NO_RECORDS_NOTICE: &str = "Sorry, No tracking records found! - Let's generate a one!";
pub const UNKNOWN_ID_NOTICE: &str = "Sorry, Not a valid UTM id!";
pub const ALREADY_LOGGED_IN_NOTICE: &str = "You have already logged in!";
pub const LOGGED_OUT_NOTICE: &str = "Successfully Logged Out! - See you soon...";

async fn redirect_with_notice(
    state: &AppState,
    session: &Session,
    jar: CookieJar,
    notice: &str,
    location: &str,
) -> Response {
    let token = state.sessions.push_notice(session, notice).await;
    let cookie = session_cookie(token, state.settings.secure_cookies);
    (jar.add(cookie), Redirect::to(location)).into_response()
}

pub async fn generator_form(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let notices = state.sessions.take_notices(&session).await;
    generator_page(&notices)
}

pub async fn generate_link(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<GenerateForm>,
) -> Result<Response, AppError> {
    let record = with_timeout(
        state.settings.store_timeout,
        tracker::generate(state.records.as_ref(), &form.label, Utc::now()),
    )
    .await??;
    let location = format!("/tracking-data/{}", record.id);
    Ok(redirect_with_notice(&state, &session, jar, GENERATED_NOTICE, &location).await)
}

pub async fn tracklist(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let records = with_timeout(state.settings.store_timeout, state.records.list_all()).await??;
    if records.is_empty() {
        return Ok(redirect_with_notice(&state, &session, jar, NO_RECORDS_NOTICE, "/").await);
    }
    let view = ListView {
        notices: state.sessions.take_notices(&session).await,
        records: records
            .iter()
            .map(|record| RecordView::new(record, &state.settings))
            .collect(),
    };
    Ok(Json(view).into_response())
}

pub async fn track(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<PixelQuery>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let request = RequestContext::from_headers(&headers);
    let served = tracker::serve_pixel(
        state.records.as_ref(),
        query.utm_id.as_deref(),
        &session,
        &request,
        Utc::now(),
        state.settings.store_timeout,
    )
    .await?;
    if let PixelServed::Preview = served {
        tracing::debug!("Pixel previewed by {:?}", session.user());
    }
    Ok(pixel_response())
}

pub async fn tracking_data(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Path(utm_id): Path<String>,
) -> Result<Response, AppError> {
    let lookup = state.records.get_by_id(&utm_id);
    let record = with_timeout(state.settings.store_timeout, lookup).await??;
    match record {
        Some(record) => {
            let view = DetailView {
                notices: state.sessions.take_notices(&session).await,
                record: RecordView::new(&record, &state.settings),
            };
            Ok(Json(view).into_response())
        }
        None => {
            let notice = UNKNOWN_ID_NOTICE;
            Ok(redirect_with_notice(&state, &session, jar, notice, "/tracklist").await)
        }
    }
}

pub async fn login_form(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> Response {
    if session.is_authenticated() {
        return redirect_with_notice(&state, &session, jar, ALREADY_LOGGED_IN_NOTICE, "/").await;
    }
    let notices = state.sessions.take_notices(&session).await;
    login_page(&notices).into_response()
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    if session.is_authenticated() {
        let notice = ALREADY_LOGGED_IN_NOTICE;
        return Ok(redirect_with_notice(&state, &session, jar, notice, "/").await);
    }
    match state
        .authenticator
        .authenticate(&session, &form.username, &form.password)
        .await
    {
        Ok(session) => {
            let jar = match session.token() {
                Some(token) => {
                    jar.add(session_cookie(token.to_string(), state.settings.secure_cookies))
                }
                None => jar,
            };
            Ok((jar, Redirect::to("/")).into_response())
        }
        Err(err @ AuthError::InvalidCredentials) => {
            Ok(redirect_with_notice(&state, &session, jar, &err.to_string(), "/login").await)
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
) -> Response {
    state.authenticator.end_session(&session).await;
    redirect_with_notice(&state, &Session::anonymous(), jar, LOGGED_OUT_NOTICE, "/login").await
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
