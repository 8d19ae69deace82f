use clap::Parser;
use siakad::app::{App, Selection};
use siakad::cli::Args;
use siakad::config::Config;
use siakad::logging::setup_logging;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Logging depends on the config, so config errors go straight to stderr.
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", anyhow::Error::from(e));
            return ExitCode::FAILURE;
        }
    };
    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        base_url = config.base_url.as_str(),
        workers = config.workers,
        "starting siakad"
    );

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!(error = ?e, "Failed to initialize application");
            return ExitCode::FAILURE;
        }
    };

    match app.run(&Selection::from(&args)).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "Run aborted");
            ExitCode::FAILURE
        }
    }
}
