//! Grade roster scraper for SIAKAD academic portals.

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod output;
pub mod portal;
pub mod prompt;
pub mod scraper;
pub mod utils;
