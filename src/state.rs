use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use url::Url;

use crate::auth::{Authenticator, Passwords, SessionStore};
use crate::store::{CredentialStore, TrackingStore};

pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080/";
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(300);

/// Per-deployment knobs the handlers need.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Absolute URL of the pixel endpoint, without query.
    pub pixel_endpoint: Url,
    /// Offset used when rendering timestamps.
    pub display_offset: FixedOffset,
    pub store_timeout: Duration,
    /// Set when the public URL is https; session cookies then carry `Secure`.
    pub secure_cookies: bool,
}

impl ServiceSettings {
    pub fn new(
        public_url: &Url,
        display_offset: FixedOffset,
        store_timeout: Duration,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            pixel_endpoint: public_url.join("track")?,
            display_offset,
            store_timeout,
            secure_cookies: public_url.scheme() == "https",
        })
    }

    pub fn pixel_url(&self, id: &str) -> String {
        let mut url = self.pixel_endpoint.clone();
        url.query_pairs_mut().append_pair("utm_id", id);
        url.to_string()
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let public_url = Url::parse(DEFAULT_PUBLIC_URL).expect("default public url is valid");
        Self::new(&public_url, Utc.fix(), DEFAULT_STORE_TIMEOUT)
            .expect("default pixel endpoint is valid")
    }
}

#[derive(Clone)]
pub struct AppState {
    pub records: Arc<dyn TrackingStore>,
    pub authenticator: Arc<Authenticator>,
    pub sessions: SessionStore,
    pub settings: Arc<ServiceSettings>,
}

impl AppState {
    pub fn new(
        records: Arc<dyn TrackingStore>,
        credentials: Arc<dyn CredentialStore>,
        passwords: Passwords,
        settings: ServiceSettings,
    ) -> Self {
        let sessions = SessionStore::new();
        let authenticator = Authenticator::new(credentials, sessions.clone(), passwords);
        Self {
            records,
            authenticator: Arc::new(authenticator),
            sessions,
            settings: Arc::new(settings),
        }
    }
}
