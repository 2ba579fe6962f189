mod ipc;

use anyhow::Context;
use gradebook::GradingConfig;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GRADEBOOKD_LOG";

// stdout carries the protocol, so logs go to stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = GradingConfig::from_env().context("failed to load grading configuration")?;
    let mut state = ipc::AppState::new(config);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        curricula = state.config.curricula.len(),
        subjects = %state.catalog.source_description(),
        "gradebookd ready"
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request line");
                ipc::bad_json(&e)
            }
        };
        writeln!(stdout, "{}", resp).context("failed to write response")?;
        stdout.flush().context("failed to flush response")?;
    }
    Ok(())
}
