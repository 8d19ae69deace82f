//! Session validation and the two-step credential login.
//!
//! The portal hands out a `PHPSESSID` on the landing page, then expects a
//! form POST carrying that id, the credentials, a short client-generated
//! validation token (sent twice) and a "reported IP". A successful reply
//! contains the literal `"success":true` and usually rotates the session id.

use crate::portal::client::{INDEX_PATH, MEDIA_PATH, PortalClient, form_body, session_cookie};
use crate::portal::errors::{AuthError, PortalError};
use crate::portal::session::{Session, SessionStore};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::Method;
use std::fmt;
use tracing::{debug, info, warn};

pub const LOGIN_PATH: &str = "/ceklogin.php?h=";

/// Substring the login endpoint returns on success.
pub const SUCCESS_MARKER: &str = r#""success":true"#;

/// Substrings on the probe page that mean we were bounced to the login form.
const LOGIN_MARKERS: &[&str] = &["login", "Username"];

/// Submitted when the public IP cannot be determined.
pub const FALLBACK_IP: &str = "182.8.179.9";

pub const DEFAULT_IP_ECHO_URL: &str = "https://api.ipify.org";

const TOKEN_LEN: usize = 3;

/// Login credentials.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the authenticator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    SessionLoaded,
    Validated,
    ReLoggingIn,
    LoggedIn,
    Failed,
}

/// Owns the session for the run and keeps it valid.
pub struct Authenticator {
    client: PortalClient,
    store: SessionStore,
    ip_echo_url: String,
    rng: StdRng,
    state: AuthState,
    session: Session,
}

impl Authenticator {
    pub fn new(client: PortalClient, store: SessionStore) -> Self {
        Self {
            client,
            store,
            ip_echo_url: DEFAULT_IP_ECHO_URL.to_string(),
            rng: StdRng::from_os_rng(),
            state: AuthState::Unauthenticated,
            session: Session::empty(),
        }
    }

    pub fn with_ip_echo_url(mut self, url: impl Into<String>) -> Self {
        self.ip_echo_url = url.into();
        self
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Reuse the stored session if the portal still accepts it, otherwise log in.
    pub async fn validate_or_login(&mut self, creds: &Credentials) -> Result<Session, AuthError> {
        match self.store.load().await {
            Ok(Some(session)) => {
                self.session = session;
                self.state = AuthState::SessionLoaded;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(path = %self.store.path().display(), error = %e, "Failed to read stored session");
            }
        }

        if self.state == AuthState::SessionLoaded {
            if self.probe().await {
                info!("Stored session still valid, skipping login");
                self.state = AuthState::Validated;
                return Ok(self.session.clone());
            }
            info!("Stored session expired");
        }

        self.state = AuthState::ReLoggingIn;
        info!("Logging in");
        self.login(&creds.username, &creds.password).await
    }

    /// True when an authenticated-only page renders without the login form.
    async fn probe(&self) -> bool {
        match self
            .client
            .request(Method::GET, MEDIA_PATH, None, &self.session)
            .await
        {
            Ok(body) => !looks_like_login_page(&body),
            Err(e) => {
                warn!(error = %e, "Session probe failed");
                false
            }
        }
    }

    /// Run the credential login and persist the resulting session.
    ///
    /// The stored session is only replaced once the portal confirms success.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session, AuthError> {
        let result = self.try_login(username, password).await;
        match &result {
            Ok(session) => {
                self.session = session.clone();
                self.state = AuthState::LoggedIn;
            }
            Err(_) => {
                self.session = Session::empty();
                self.state = AuthState::Failed;
            }
        }
        result
    }

    async fn try_login(&mut self, username: &str, password: &str) -> Result<Session, AuthError> {
        let landing = self
            .client
            .send(Method::GET, INDEX_PATH, None, &Session::empty(), INDEX_PATH)
            .await?;
        let initial = session_cookie(landing.headers())
            .and_then(|v| Session::from_cookie_value(&v))
            .ok_or(AuthError::NoInitialSession)?;
        debug!("Initial session id issued");

        let token = generate_token(&mut self.rng);
        let reported_ip = self.reported_ip().await;

        let body = form_body(&[
            ("username", username),
            ("password", password),
            ("validation", &token),
            ("hide_validation", &token),
            ("hide_ipnya", &reported_ip),
        ]);
        let resp = self
            .client
            .send(Method::POST, LOGIN_PATH, Some(body), &initial, INDEX_PATH)
            .await?;

        let rotated = session_cookie(resp.headers()).and_then(|v| Session::from_cookie_value(&v));
        let status = resp.status();
        let text = resp.bytes().await.map_err(PortalError::from)?;

        if !String::from_utf8_lossy(&text).contains(SUCCESS_MARKER) {
            warn!(status = status.as_u16(), "Login response lacks success marker");
            return Err(AuthError::LoginRejected);
        }

        let session = rotated.unwrap_or(initial);
        match self.store.save(&session).await {
            Ok(()) => info!("Login succeeded, session stored"),
            Err(e) => warn!(
                path = %self.store.path().display(),
                error = %e,
                "Login succeeded but the session could not be stored"
            ),
        }
        Ok(session)
    }

    /// Public IP as reported by an echo service, or [`FALLBACK_IP`].
    async fn reported_ip(&self) -> String {
        let resp = match self.client.http().get(&self.ip_echo_url).send().await {
            Ok(resp) if resp.status().is_success() => resp,
            Ok(resp) => {
                warn!(status = resp.status().as_u16(), "IP echo failed, using fallback");
                return FALLBACK_IP.to_string();
            }
            Err(e) => {
                warn!(error = %e, "IP echo failed, using fallback");
                return FALLBACK_IP.to_string();
            }
        };
        match resp.text().await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => FALLBACK_IP.to_string(),
        }
    }
}

fn looks_like_login_page(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    LOGIN_MARKERS.iter().any(|m| text.contains(m))
}

/// Three random ASCII alphanumerics for the anti-automation fields.
fn generate_token(rng: &mut impl Rng) -> String {
    (0..TOKEN_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}
