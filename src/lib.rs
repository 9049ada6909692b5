//! # mail-tracker
//!
//! Email open tracking. Logged-in users generate tracking records whose pixel
//! URL gets embedded in outgoing mail; every pixel fetch by anyone who is not
//! logged in is stored as a hit with its timestamp and requester metadata.
//!
//! - [`tracker`] - link generation and pixel hit recording
//! - [`store`] - storage traits and the in-memory store
//! - [`dao`] - PostgreSQL store
//! - [`auth`] - password digests, sessions and the login gate
//! - [`routes`] / [`views`] - the HTTP surface

pub mod auth;
pub mod config;
pub mod dao;
pub mod error;
pub mod model;
pub mod pixel;
pub mod routes;
pub mod state;
pub mod store;
pub mod tracker;
pub mod utils;
pub mod views;

use auth::require_login;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use routes::{
    generate_link, generator_form, health, login, login_form, logout, track, tracking_data,
    tracklist,
};
use tower_http::trace::TraceLayer;

pub use auth::{Passwords, Session};
pub use config::Config;
pub use state::{AppState, ServiceSettings};
pub use store::MemoryStore;

pub fn create_router(state: AppState) -> Router {
    let logged_in = Router::new()
        .route("/", get(generator_form).post(generate_link))
        .route("/index/", get(generator_form).post(generate_link))
        .route("/tracklist", get(tracklist))
        .route("/tracking-data/{utm_id}", get(tracking_data))
        .route("/logout", get(logout))
        .route_layer(from_fn_with_state(state.clone(), require_login));

    Router::new()
        .merge(logged_in)
        .route("/track", get(track))
        .route("/login", get(login_form).post(login))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
