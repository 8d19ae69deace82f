//! Error types for the portal API client.

/// Failure of a single portal request.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("request to portal failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("portal responded with status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("failed to parse response from {url}")]
    Malformed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PortalError {
    /// True when the response arrived but its body could not be decoded.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// No authenticated session could be established.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("portal did not issue an initial session id")]
    NoInitialSession,
    #[error("portal rejected the login")]
    LoginRejected,
    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Terms or tracks could not be resolved; nothing can proceed without them.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} catalog is empty")]
    Empty(&'static str),
    #[error("{what} catalog is malformed")]
    Malformed {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Portal(PortalError),
    #[error("failed to read track catalog {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl From<PortalError> for CatalogError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::Malformed { source, .. } => Self::Malformed {
                what: "term",
                source,
            },
            other => Self::Portal(other),
        }
    }
}
