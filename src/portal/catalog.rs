//! Term listing (from the portal) and the local track catalog.

use crate::portal::client::PortalClient;
use crate::portal::errors::CatalogError;
use crate::portal::models::{Term, Track};
use crate::portal::session::Session;
use std::path::Path;
use tracing::{debug, info};

pub const TERMS_PATH: &str = "/_modul/aksi_umum.php?act=pilih_smtthnakd";

/// Fetch the selectable terms. An empty list is an error.
pub async fn list_terms(client: &PortalClient, session: &Session) -> Result<Vec<Term>, CatalogError> {
    let terms: Vec<Term> = client.post_json(TERMS_PATH, None, session).await?;
    if terms.is_empty() {
        return Err(CatalogError::Empty("term"));
    }
    info!(count = terms.len(), "Fetched terms");
    Ok(terms)
}

/// Tracks loaded once from a JSON file.
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    tracks: Vec<Track>,
}

impl TrackCatalog {
    /// Read and parse the catalog file. Unreadable, malformed or empty is fatal.
    pub async fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = tokio::fs::read(path).await.map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let catalog = Self::from_slice(&raw)?;
        info!(path = %path.display(), count = catalog.tracks.len(), "Loaded track catalog");
        Ok(catalog)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, CatalogError> {
        let tracks: Vec<Track> =
            crate::portal::json::decode(raw).map_err(|source| CatalogError::Malformed {
                what: "track",
                source,
            })?;
        if tracks.is_empty() {
            return Err(CatalogError::Empty("track"));
        }
        Ok(Self { tracks })
    }

    /// Tracks that can be scraped, in file order. Entries without a code are dropped.
    pub fn usable(&self) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|t| {
                let usable = !t.code.trim().is_empty();
                if !usable {
                    debug!(name = t.name.as_str(), "Skipping track without code");
                }
                usable
            })
            .collect()
    }

    /// Usable tracks whose code is in `codes`, in catalog order.
    pub fn select(&self, codes: &[String]) -> Vec<&Track> {
        self.usable()
            .into_iter()
            .filter(|t| codes.iter().any(|c| c == &t.code))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
