//! Per-track section listing and roster retrieval.
//!
//! The portal keeps the selected track and term in the server-side session.
//! [`SectionFetcher::set_context`] must succeed before anything else can be
//! listed; it returns an [`ActiveContext`] that the dependent calls require,
//! so the ordering is enforced by the type system rather than call order.

use crate::portal::client::PortalClient;
use crate::portal::errors::PortalError;
use crate::portal::models::{RosterEntry, SectionList};
use crate::portal::session::Session;
use tracing::{debug, trace};

pub const CONTEXT_PATH: &str = "/_modul/mod_prodi_smthn/aksi_prodi_smthn.php";
pub const RECAP_PATH: &str = "/_modul/mod_nilmk/aksi_nilmk.php?act=rekapNILMK";
pub const ROSTER_PATH: &str = "/_modul/mod_nilmk/aksi_nilmk.php?act=listNILMK";

/// Single bulk page; the portal has no further pagination we follow.
pub const RECAP_QUERY: &str = "page=1&rows=300&sort=hari&order=asc";

/// Proof that the server-side track/term context has been set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveContext {
    track_code: String,
    term_code: String,
}

impl ActiveContext {
    pub fn track_code(&self) -> &str {
        &self.track_code
    }

    pub fn term_code(&self) -> &str {
        &self.term_code
    }
}

/// Section and roster calls bound to one client and session.
#[derive(Debug, Clone, Copy)]
pub struct SectionFetcher<'a> {
    client: &'a PortalClient,
    session: &'a Session,
}

impl<'a> SectionFetcher<'a> {
    pub fn new(client: &'a PortalClient, session: &'a Session) -> Self {
        Self { client, session }
    }

    /// Select the track and term server-side. The response body is ignored.
    pub async fn set_context(
        &self,
        track_code: &str,
        mode: &str,
        term_code: &str,
    ) -> Result<ActiveContext, PortalError> {
        self.client
            .post_form(
                CONTEXT_PATH,
                &[("ps", track_code), ("pk", mode), ("smthn", term_code)],
                self.session,
            )
            .await?;
        debug!(track = track_code, term = term_code, "Context set");
        Ok(ActiveContext {
            track_code: track_code.to_string(),
            term_code: term_code.to_string(),
        })
    }

    /// List every section visible under `ctx`.
    pub async fn list_sections(&self, ctx: &ActiveContext) -> Result<SectionList, PortalError> {
        let list: SectionList = self
            .client
            .post_json(RECAP_PATH, Some(RECAP_QUERY.to_string()), self.session)
            .await?;
        debug!(
            track = ctx.track_code.as_str(),
            total = list.total,
            rows = list.rows.len(),
            "Listed sections"
        );
        Ok(list)
    }

    /// Fetch the grade roster for one section.
    pub async fn fetch_roster(
        &self,
        ctx: &ActiveContext,
        roster_key: &str,
    ) -> Result<Vec<RosterEntry>, PortalError> {
        trace!(track = ctx.track_code.as_str(), roster_key, "Fetching roster");
        let body = crate::portal::client::form_body(&[("param", roster_key), ("cetak", "1")]);
        self.client.post_json(ROSTER_PATH, Some(body), self.session).await
    }
}
