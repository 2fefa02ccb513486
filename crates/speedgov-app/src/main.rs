#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Binary entrypoint that wires the governor and auto-remove engines
//! together and runs them until a shutdown signal arrives.

use speedgov_app::run_app;
use speedgov_telemetry::{LoggingConfig, init_logging};

/// Initializes logging, then bootstraps and runs the application until
/// shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(&LoggingConfig::default())?;
    run_app().await?;
    Ok(())
}
