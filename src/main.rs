use clap::Parser;
use dotenvy::dotenv;
use mail_tracker::dao::PgStore;
use mail_tracker::store::{CredentialStore, TrackingStore};
use mail_tracker::{create_router, AppState, Config, MemoryStore, Passwords};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEFAULT_TRACING_LEVEL: &str = "mail_tracker=debug,tower_http=info";

#[tokio::main]
async fn main() {
    _ = dotenv();
    let config = Config::parse();
    configure_tracing();
    let settings = config
        .service_settings()
        .expect("PUBLIC_URL cannot be used as a base for pixel urls");
    let (records, credentials) = create_stores(&config).await;
    let state = AppState::new(records, credentials, Passwords::default(), settings);
    if let Some((username, password)) = config.admin_account() {
        create_admin_account(&state, username, password).await;
    }
    let listener = create_listener(&config.server_address).await;
    let router = create_router(state);
    axum::serve(listener, router)
        .await
        .expect("Server failed to start");
}

fn configure_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or(DEFAULT_TRACING_LEVEL.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn create_stores(config: &Config) -> (Arc<dyn TrackingStore>, Arc<dyn CredentialStore>) {
    match &config.database_url {
        Some(database_url) => {
            let store = PgStore::connect(database_url, config.database_max_connections)
                .await
                .expect("Creating database connection pool failed");
            store.migrate().await.expect("Running database migrations failed");
            tracing::info!("Using PostgreSQL store");
            let store = Arc::new(store);
            let records: Arc<dyn TrackingStore> = store.clone();
            let credentials: Arc<dyn CredentialStore> = store;
            (records, credentials)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tracking data is kept in memory only");
            let store = Arc::new(MemoryStore::new());
            let records: Arc<dyn TrackingStore> = store.clone();
            let credentials: Arc<dyn CredentialStore> = store;
            (records, credentials)
        }
    }
}

async fn create_admin_account(state: &AppState, username: &str, password: &str) {
    let created = state
        .authenticator
        .ensure_account(username, password)
        .await
        .expect("Creating admin account failed");
    if created {
        tracing::info!("Created account {}", username);
    }
}

async fn create_listener(server_address: &str) -> TcpListener {
    let listener = TcpListener::bind(&server_address)
        .await
        .expect("Creating tcp listener failed");
    tracing::info!("Listening on address: {}", server_address);
    listener
}
