//! Interactive term and track menus.

use crate::portal::{Term, Track};
use anyhow::{Result, bail};
use dialoguer::Select;
use dialoguer::console::Term as Console;

/// Let the user pick one term. The list is shown in portal order.
pub fn choose_term(terms: &[Term]) -> Result<&Term> {
    if terms.is_empty() {
        bail!("no terms to choose from");
    }
    let labels: Vec<String> = terms
        .iter()
        .map(|t| format!("{} ({})", t.label, t.code))
        .collect();
    let choice = Select::new()
        .with_prompt("Select a term")
        .items(&labels)
        .default(0)
        .interact_on(&Console::stderr())?;
    Ok(&terms[choice])
}

/// Let the user pick one track or all of them (the first entry).
pub fn choose_tracks<'a>(tracks: &[&'a Track]) -> Result<Vec<&'a Track>> {
    if tracks.is_empty() {
        bail!("no tracks to choose from");
    }
    let labels = track_labels(tracks);
    let choice = Select::new()
        .with_prompt("Select a track")
        .items(&labels)
        .default(0)
        .interact_on(&Console::stderr())?;
    Ok(resolve_track_choice(tracks, choice))
}

fn track_labels(tracks: &[&Track]) -> Vec<String> {
    std::iter::once("All tracks".to_string())
        .chain(tracks.iter().map(|t| format!("{} ({})", t.name, t.code)))
        .collect()
}

fn resolve_track_choice<'a>(tracks: &[&'a Track], choice: usize) -> Vec<&'a Track> {
    match choice {
        0 => tracks.to_vec(),
        n => tracks.get(n - 1).copied().into_iter().collect(),
    }
}
