use crate::model::UserAccount;
use crate::state::AppState;
use crate::store::{CredentialStore, StoreError};
use crate::utils::generate_token;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

pub const SESSION_COOKIE: &str = "tracker_session";
pub const LOGIN_REQUIRED_NOTICE: &str = "Please log in to access this page.";
pub const ANONYMOUS_SESSION_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum AuthError {
    /// Deliberately the same message for unknown users and wrong passwords.
    #[error("Please check your login details and try again.")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Argon2 password digests in PHC string format.
#[derive(Clone)]
pub struct Passwords {
    argon2: Argon2<'static>,
}

impl Default for Passwords {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl Passwords {
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| AuthError::Hashing(err.to_string()))
    }

    /// A digest that cannot be parsed never matches.
    pub fn verify(&self, password: &str, digest: &str) -> bool {
        match PasswordHash::new(digest) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(err) => {
                tracing::warn!("Stored password digest is malformed: {}", err);
                false
            }
        }
    }
}

/// The caller's session for one request.
///
/// Extracted from the session cookie and handed explicitly to every
/// operation that depends on who is asking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    token: Option<String>,
    user: Option<String>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn authenticated(token: String, user: String) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl<S> FromRequestParts<S> for Session
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionStore::from_ref(state);
        let token = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());
        Ok(sessions.resolve(token).await)
    }
}

#[derive(Debug)]
struct SessionData {
    user: Option<String>,
    notices: Vec<String>,
    opened: Instant,
}

impl SessionData {
    fn new(user: Option<String>, notices: Vec<String>) -> Self {
        Self {
            user,
            notices,
            opened: Instant::now(),
        }
    }
}

/// Live sessions keyed by their random token, anonymous ones included.
///
/// Anonymous sessions only exist to carry notices. They are dropped once
/// their notices are read, and pruned after `anonymous_ttl` otherwise.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionData>>>,
    anonymous_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_anonymous_ttl(ANONYMOUS_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_anonymous_ttl(anonymous_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            anonymous_ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn open(&self, user: Option<String>) -> String {
        let token = generate_token();
        self.sessions
            .write()
            .await
            .insert(token.clone(), SessionData::new(user, Vec::new()));
        token
    }

    /// Unknown or expired tokens resolve to an anonymous session without a token.
    pub async fn resolve(&self, token: Option<String>) -> Session {
        let Some(token) = token else {
            return Session::anonymous();
        };
        match self.sessions.read().await.get(&token) {
            Some(data) => Session {
                user: data.user.clone(),
                token: Some(token),
            },
            None => Session::anonymous(),
        }
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Queues a notice for the next view and returns the token that holds it,
    /// opening an anonymous session when the caller has none.
    pub async fn push_notice(&self, session: &Session, notice: impl Into<String>) -> String {
        let notice = notice.into();
        let mut sessions = self.sessions.write().await;
        if let Some(token) = session.token() {
            if let Some(data) = sessions.get_mut(token) {
                data.notices.push(notice);
                return token.to_string();
            }
        }
        let ttl = self.anonymous_ttl;
        sessions.retain(|_, data| data.user.is_some() || data.opened.elapsed() < ttl);
        let token = generate_token();
        sessions.insert(token.clone(), SessionData::new(None, vec![notice]));
        token
    }

    /// Drains pending notices. An anonymous session has no further use
    /// afterwards and is dropped.
    pub async fn take_notices(&self, session: &Session) -> Vec<String> {
        let Some(token) = session.token() else {
            return Vec::new();
        };
        let mut sessions = self.sessions.write().await;
        let anonymous = match sessions.get(token) {
            Some(data) => data.user.is_none(),
            None => return Vec::new(),
        };
        if anonymous {
            sessions
                .remove(token)
                .map(|data| data.notices)
                .unwrap_or_default()
        } else {
            sessions
                .get_mut(token)
                .map(|data| std::mem::take(&mut data.notices))
                .unwrap_or_default()
        }
    }
}

impl FromRef<AppState> for SessionStore {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

/// `secure` should be set whenever the service is reached over https.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

pub struct Authenticator {
    credentials: Arc<dyn CredentialStore>,
    sessions: SessionStore,
    passwords: Passwords,
    // verified against for unknown usernames so both rejections cost the same
    dummy_digest: Option<String>,
}

impl Authenticator {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: SessionStore,
        passwords: Passwords,
    ) -> Self {
        let dummy_digest = passwords.hash(&generate_token()).ok();
        Self {
            credentials,
            sessions,
            passwords,
            dummy_digest,
        }
    }

    /// Checks the credentials and, on success, replaces `previous` with a
    /// fresh session bound to the user.
    pub async fn authenticate(
        &self,
        previous: &Session,
        username: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let Some(account) = self.credentials.find_user(username).await? else {
            if let Some(dummy_digest) = &self.dummy_digest {
                self.passwords.verify(password, dummy_digest);
            }
            tracing::info!("Login attempt for unknown user {}", username);
            return Err(AuthError::InvalidCredentials);
        };
        if !self.passwords.verify(password, &account.password_digest) {
            tracing::info!("Wrong password for user {}", username);
            return Err(AuthError::InvalidCredentials);
        }
        if let Some(token) = previous.token() {
            self.sessions.remove(token).await;
        }
        let token = self.sessions.open(Some(account.username.clone())).await;
        tracing::info!("User {} logged in", account.username);
        Ok(Session::authenticated(token, account.username))
    }

    pub async fn end_session(&self, session: &Session) {
        if let Some(token) = session.token() {
            self.sessions.remove(token).await;
        }
        if let Some(user) = session.user() {
            tracing::info!("User {} logged out", user);
        }
    }

    /// Creates the account unless the username is taken. Returns whether it was created.
    pub async fn ensure_account(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        if self.credentials.find_user(username).await?.is_some() {
            return Ok(false);
        }
        let account = UserAccount {
            username: username.to_string(),
            password_digest: self.passwords.hash(password)?,
        };
        self.credentials.create_user(&account).await?;
        Ok(true)
    }
}

pub async fn require_login(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    if session.is_authenticated() {
        return next.run(request).await;
    }
    let token = state
        .sessions
        .push_notice(&session, LOGIN_REQUIRED_NOTICE)
        .await;
    let cookie = session_cookie(token, state.settings.secure_cookies);
    (jar.add(cookie), Redirect::to("/login")).into_response()
}
