use clap::{Parser, ValueEnum};

/// Download published grade rosters from a SIAKAD portal.
///
/// Without `--term` or `--track`, the term and tracks are chosen from an
/// interactive menu.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = TracingFormat::Pretty)]
    pub tracing: TracingFormat,

    /// Term code to scrape (e.g. `20241`), skipping the term menu
    #[arg(long, value_name = "CODE")]
    pub term: Option<String>,

    /// Track code to scrape; repeat for several tracks
    #[arg(long = "track", value_name = "CODE", conflicts_with = "all_tracks")]
    pub tracks: Vec<String>,

    /// Scrape every track in the catalog, skipping the track menu
    #[arg(long)]
    pub all_tracks: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TracingFormat {
    /// Human-readable output for terminals
    Pretty,
    /// One JSON object per line
    Json,
}
