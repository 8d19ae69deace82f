//! Portal session credential and its on-disk store.

use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Name of the PHP session cookie issued by the portal.
pub const SESSION_COOKIE: &str = "PHPSESSID";

/// An authenticated session, held as a single `name=value` cookie pair.
///
/// Either empty (no login yet) or one well-formed pair; never anything else.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session(String);

impl Session {
    /// Session with no credential attached.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a session from the value of the portal's session cookie.
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        Self::parse(&format!("{SESSION_COOKIE}={value}"))
    }

    /// Parse a stored `name=value` pair; anything else is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (name, value) = raw.split_once('=')?;
        let well_formed = !name.is_empty()
            && !value.is_empty()
            && !raw.contains(|c: char| c == ';' || c.is_whitespace() || c.is_control());
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Value for the `Cookie` request header.
    pub fn header_value(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Session(<empty>)")
        } else {
            f.write_str("Session(<redacted>)")
        }
    }
}

/// File-backed persistence for a single [`Session`].
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted session. A missing file means no prior session.
    pub async fn load(&self) -> std::io::Result<Option<Session>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No stored session");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if raw.trim().is_empty() {
            return Ok(None);
        }
        match Session::parse(&raw) {
            Some(session) => {
                debug!(path = %self.path.display(), "Stored session found");
                Ok(Some(session))
            }
            None => {
                warn!(path = %self.path.display(), "Stored session is malformed, ignoring");
                Ok(None)
            }
        }
    }

    /// Persist `session`, replacing the previous one atomically.
    ///
    /// Empty sessions are not written.
    pub async fn save(&self, session: &Session) -> std::io::Result<()> {
        if session.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, session.header_value()).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }
}
