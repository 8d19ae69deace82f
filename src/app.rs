use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputLayout;
use crate::portal::{Authenticator, PortalClient, Session, SessionStore, Term, Track, TrackCatalog, list_terms};
use crate::prompt;
use crate::scraper::{Orchestrator, TrackSummary};
use crate::utils::{fmt_duration, warn_if_slow};
use anyhow::{Context, bail};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SLOW_LOGIN: Duration = Duration::from_secs(5);

/// What to scrape. Unset parts are asked for interactively.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub term: Option<String>,
    pub tracks: Vec<String>,
    pub all_tracks: bool,
}

impl From<&Args> for Selection {
    fn from(args: &Args) -> Self {
        Self {
            term: args.term.clone(),
            tracks: args.tracks.clone(),
            all_tracks: args.all_tracks,
        }
    }
}

/// Outcome of a whole run across tracks.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub term: String,
    pub tracks: Vec<TrackSummary>,
    /// Tracks whose context or section listing failed.
    pub failed_tracks: Vec<String>,
}

impl RunSummary {
    pub fn done(&self) -> usize {
        self.tracks.iter().map(|t| t.done).sum()
    }

    pub fn failed(&self) -> usize {
        self.tracks.iter().map(|t| t.failed).sum()
    }

    pub fn skipped(&self) -> usize {
        self.tracks.iter().map(|t| t.skipped).sum()
    }
}

/// Main application struct: authenticate, pick a term and tracks, scrape each track.
pub struct App {
    config: Config,
    client: PortalClient,
    layout: OutputLayout,
    show_progress: bool,
}

impl App {
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let client = PortalClient::new(&config.base_url, config.request_timeout())
            .context("Failed to build HTTP client")?;
        let layout = OutputLayout::new(&config.json_dir, &config.excel_dir);
        Ok(Self {
            config,
            client,
            layout,
            show_progress: true,
        })
    }

    /// Disable the progress bar for every track.
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, selection: &Selection) -> Result<RunSummary, anyhow::Error> {
        let start = Instant::now();
        let session = self.authenticate().await?;

        let terms = list_terms(&self.client, &session)
            .await
            .context("Failed to list terms")?;
        let term = choose_term(&terms, selection.term.as_deref())?;
        info!(term = term.code.as_str(), label = term.label.as_str(), "Term selected");

        let catalog = TrackCatalog::load(&self.config.track_file)
            .await
            .context("Failed to load track catalog")?;
        let tracks = choose_tracks(&catalog, selection)?;

        let orchestrator = Orchestrator::new(&self.client, &session, &self.layout)
            .with_workers(self.config.workers)
            .with_mode(self.config.study_mode.as_str());
        let orchestrator = if self.show_progress {
            orchestrator
        } else {
            orchestrator.quiet()
        };

        let mut summary = RunSummary {
            term: term.code.clone(),
            ..Default::default()
        };
        for track in tracks {
            match orchestrator.scrape_track(track, &term.code).await {
                Ok(track_summary) => summary.tracks.push(track_summary),
                Err(e) => {
                    error!(track = track.name.as_str(), error = ?e, "Track failed, continuing");
                    summary.failed_tracks.push(track.name.clone());
                }
            }
        }

        info!(
            term = summary.term.as_str(),
            tracks = summary.tracks.len(),
            failed_tracks = summary.failed_tracks.len(),
            done = summary.done(),
            failed = summary.failed(),
            skipped = summary.skipped(),
            duration = fmt_duration(start.elapsed()),
            "Run finished"
        );
        Ok(summary)
    }

    async fn authenticate(&self) -> Result<Session, anyhow::Error> {
        let start = Instant::now();
        let store = SessionStore::new(&self.config.session_file);
        let mut auth = Authenticator::new(self.client.clone(), store)
            .with_ip_echo_url(self.config.ip_echo_url.as_str());
        let session = auth
            .validate_or_login(&self.config.credentials())
            .await
            .context("Authentication failed")?;
        warn_if_slow(start, SLOW_LOGIN, "authentication");
        info!("Logged in as {}", self.config.username);
        Ok(session)
    }
}

fn choose_term<'a>(terms: &'a [Term], code: Option<&str>) -> Result<&'a Term, anyhow::Error> {
    match code {
        Some(code) => terms
            .iter()
            .find(|t| t.code == code)
            .with_context(|| format!("Term {code} is not offered by the portal")),
        None => prompt::choose_term(terms),
    }
}

fn choose_tracks<'a>(
    catalog: &'a TrackCatalog,
    selection: &Selection,
) -> Result<Vec<&'a Track>, anyhow::Error> {
    let usable = catalog.usable();
    if usable.is_empty() {
        bail!("Track catalog has no track with a code");
    }
    if selection.all_tracks {
        return Ok(usable);
    }
    if selection.tracks.is_empty() {
        return prompt::choose_tracks(&usable);
    }

    let chosen = catalog.select(&selection.tracks);
    for code in &selection.tracks {
        if !chosen.iter().any(|t| &t.code == code) {
            warn!(code = code.as_str(), "Unknown track code, ignoring");
        }
    }
    if chosen.is_empty() {
        bail!("None of the requested tracks are in the catalog");
    }
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TrackCatalog {
        TrackCatalog::from_slice(
            br#"[
                {"jrsid":"1","kodejrs":"55201","namajrs":"Teknik Informatika"},
                {"jrsid":"2","kodejrs":"","namajrs":"Unassigned"},
                {"jrsid":"3","kodejrs":"57201","namajrs":"Sistem Informasi"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_choose_term_by_code() {
        let terms = vec![
            Term { label: "Ganjil 2024/2025".into(), code: "20241".into() },
            Term { label: "Genap 2024/2025".into(), code: "20242".into() },
        ];
        assert_eq!(choose_term(&terms, Some("20242")).unwrap().label, "Genap 2024/2025");
        assert!(choose_term(&terms, Some("19991")).is_err());
    }

    #[test]
    fn test_all_tracks_skips_empty_codes() {
        let catalog = catalog();
        let selection = Selection { all_tracks: true, ..Default::default() };
        let tracks = choose_tracks(&catalog, &selection).unwrap();
        let codes: Vec<&str> = tracks.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["55201", "57201"]);
    }

    #[test]
    fn test_explicit_tracks_filter() {
        let catalog = catalog();
        let selection = Selection {
            tracks: vec!["57201".into(), "99999".into()],
            ..Default::default()
        };
        let tracks = choose_tracks(&catalog, &selection).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name, "Sistem Informasi");
    }

    #[test]
    fn test_unknown_tracks_only_is_error() {
        let catalog = catalog();
        let selection = Selection {
            tracks: vec!["99999".into()],
            ..Default::default()
        };
        assert!(choose_tracks(&catalog, &selection).is_err());
    }
}
