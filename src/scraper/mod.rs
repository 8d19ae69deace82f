//! Per-track scrape: set context, list sections, fan out roster fetches.
//!
//! Tracks are processed one at a time. Within a track, printable sections
//! are fetched by a bounded pool of concurrent workers; each worker owns one
//! section end to end, so the only shared state is the progress counter.

pub mod progress;

use crate::output::{ArtifactDirs, OutputLayout, WriteError, assign_stems, write_artifact};
use crate::portal::errors::PortalError;
use crate::portal::models::{Section, SectionList, Track};
use crate::portal::sections::{ActiveContext, SectionFetcher};
use crate::portal::{PortalClient, Session};
use crate::utils::{fmt_duration, warn_if_slow};
use futures::stream::{self, StreamExt};
use progress::Progress;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Concurrent roster fetches per track.
pub const WORKER_COUNT: usize = 5;

/// Study-mode constant sent with the context selection.
pub const DEFAULT_MODE: &str = "REG";

const SLOW_ROSTER: Duration = Duration::from_secs(10);

/// A track could not be scraped at all.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Portal(#[from] PortalError),
    #[error("failed to prepare output directories")]
    Output(#[from] WriteError),
}

/// Tally for one track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackSummary {
    pub track: String,
    pub term: String,
    /// Section count the server reports; may exceed `listed` past the page cap.
    pub reported_total: usize,
    /// Sections actually returned in the listing.
    pub listed: usize,
    /// Sections with published grades.
    pub eligible: usize,
    /// Sections left out because grades are not published.
    pub skipped: usize,
    /// Eligible sections whose roster was fetched.
    pub done: usize,
    /// Eligible sections whose roster fetch failed.
    pub failed: usize,
    /// Fetched sections where at least one output file could not be written.
    pub incomplete_writes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionOutcome {
    Written,
    WriteIncomplete,
    FetchFailed,
}

/// Drives the scrape of a track with a fixed worker bound.
#[derive(Debug, Clone)]
pub struct Orchestrator<'a> {
    client: &'a PortalClient,
    session: &'a Session,
    layout: &'a OutputLayout,
    workers: usize,
    mode: String,
    show_progress: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(client: &'a PortalClient, session: &'a Session, layout: &'a OutputLayout) -> Self {
        Self {
            client,
            session,
            layout,
            workers: WORKER_COUNT,
            mode: DEFAULT_MODE.to_string(),
            show_progress: true,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Disable the terminal progress bar (summary logs are unaffected).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Scrape every printable section of `track` for `term_code`.
    ///
    /// Returns once every dispatched fetch has finished.
    pub async fn scrape_track(
        &self,
        track: &Track,
        term_code: &str,
    ) -> Result<TrackSummary, ScrapeError> {
        let start = Instant::now();
        let fetcher = SectionFetcher::new(self.client, self.session);

        let ctx = fetcher.set_context(&track.code, &self.mode, term_code).await?;
        let list = fetcher.list_sections(&ctx).await?;

        let summary = self.scrape_sections(&fetcher, &ctx, track, list).await?;
        info!(
            track = summary.track.as_str(),
            term = summary.term.as_str(),
            done = summary.done,
            eligible = summary.eligible,
            listed = summary.listed,
            reported_total = summary.reported_total,
            skipped = summary.skipped,
            failed = summary.failed,
            duration = fmt_duration(start.elapsed()),
            "Track finished"
        );
        Ok(summary)
    }

    async fn scrape_sections(
        &self,
        fetcher: &SectionFetcher<'_>,
        ctx: &ActiveContext,
        track: &Track,
        list: SectionList,
    ) -> Result<TrackSummary, ScrapeError> {
        if list.total > list.rows.len() {
            warn!(
                track = track.name.as_str(),
                reported = list.total,
                returned = list.rows.len(),
                "Portal reports more sections than one page returned"
            );
        }

        let (eligible, skipped): (Vec<&Section>, Vec<&Section>) =
            list.rows.iter().partition(|s| s.is_printable());

        let mut summary = TrackSummary {
            track: track.name.clone(),
            term: ctx.term_code().to_string(),
            reported_total: list.total,
            listed: list.rows.len(),
            eligible: eligible.len(),
            skipped: skipped.len(),
            ..Default::default()
        };

        if eligible.is_empty() {
            warn!(
                track = track.name.as_str(),
                skipped = summary.skipped,
                "No sections with published grades"
            );
            return Ok(summary);
        }

        let dirs = self.layout.dirs(&track.name, ctx.term_code());
        dirs.create().await?;

        let stems = assign_stems(&eligible);
        let counter = Mutex::new(if self.show_progress {
            Progress::new(track.name.clone(), eligible.len())
        } else {
            Progress::hidden(track.name.clone(), eligible.len())
        });
        info!(
            track = track.name.as_str(),
            eligible = summary.eligible,
            workers = self.workers,
            "Scraping track"
        );

        let outcomes: Vec<SectionOutcome> = stream::iter(eligible.into_iter().zip(stems))
            .map(|(section, stem)| {
                let dirs = &dirs;
                let counter = &counter;
                async move {
                    let outcome = self.scrape_section(fetcher, ctx, dirs, section, stem).await;
                    counter
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .record(outcome != SectionOutcome::FetchFailed);
                    outcome
                }
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let counter = counter.into_inner().unwrap_or_else(PoisonError::into_inner);
        counter.finish();
        summary.done = counter.done();
        summary.failed = counter.failed();
        summary.incomplete_writes = outcomes
            .iter()
            .filter(|o| **o == SectionOutcome::WriteIncomplete)
            .count();
        Ok(summary)
    }

    async fn scrape_section(
        &self,
        fetcher: &SectionFetcher<'_>,
        ctx: &ActiveContext,
        dirs: &ArtifactDirs,
        section: &Section,
        stem: String,
    ) -> SectionOutcome {
        let start = Instant::now();
        let fetched = fetcher.fetch_roster(ctx, &section.roster_key).await;
        warn_if_slow(start, SLOW_ROSTER, "roster fetch");
        let roster = match fetched {
            Ok(roster) => roster,
            Err(e) if e.is_malformed() => {
                error!(section = section.name.as_str(), error = %e, detail = ?e, "Malformed roster, skipping section");
                return SectionOutcome::FetchFailed;
            }
            Err(e) => {
                error!(section = section.name.as_str(), error = %e, "Failed to fetch roster");
                return SectionOutcome::FetchFailed;
            }
        };
        debug!(section = section.name.as_str(), students = roster.len(), "Roster fetched");

        let dirs = dirs.clone();
        let name = section.name.clone();
        let report = match tokio::task::spawn_blocking(move || write_artifact(&dirs, &stem, &roster)).await {
            Ok(report) => report,
            Err(e) => {
                error!(section = name.as_str(), error = %e, "Writer task failed");
                return SectionOutcome::WriteIncomplete;
            }
        };

        if let Err(e) = &report.record {
            error!(section = name.as_str(), error = ?e, "Failed to write record file");
        }
        if let Err(e) = &report.spreadsheet {
            error!(section = name.as_str(), error = ?e, "Failed to write spreadsheet");
        }
        if report.is_complete() {
            SectionOutcome::Written
        } else {
            SectionOutcome::WriteIncomplete
        }
    }
}
