#![forbid(unsafe_code)]

//! Replay a scripted scroll session and print its report as JSON.
//!
//! # Running
//!
//! ```sh
//! cargo run -p recwin-harness
//! RECWIN_HARNESS_CONFIG=session.json cargo run -p recwin-harness
//! RECWIN_HARNESS_FAIL_EVERY=4 RUST_LOG=recwin_core=debug cargo run -p recwin-harness
//! ```
//!
//! Exit status is 0 for a clean run, 1 when the report records violations,
//! 2 when the session could not be set up.

use std::path::PathBuf;
use std::process::ExitCode;

use recwin_harness::{HarnessError, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    let report = match load_config().and_then(Session::run) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(%err, "session setup failed");
            eprintln!("recwin-harness: {err}");
            return ExitCode::from(2);
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            eprintln!("recwin-harness: cannot encode report: {err}");
            return ExitCode::from(2);
        }
    }

    if report.is_clean() {
        tracing::info!(
            steps = report.steps,
            records_seen = report.records_seen,
            window_len = report.window_len,
            "session clean"
        );
        ExitCode::SUCCESS
    } else {
        tracing::warn!(
            contiguity = report.contiguity_violations,
            invariants = report.invariant_violations.len(),
            "session recorded violations"
        );
        ExitCode::from(1)
    }
}

fn load_config() -> Result<SessionConfig, HarnessError> {
    match env_string("RECWIN_HARNESS_CONFIG") {
        Some(path) => SessionConfig::load(&PathBuf::from(path)),
        None => SessionConfig::from_env(),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if env_flag("RECWIN_LOG_JSON").unwrap_or(false) {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = std::env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(matches!(
        trimmed,
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "on" | "ON"
    ))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
