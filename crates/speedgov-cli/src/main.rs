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

//! Thin binary entrypoint that delegates to [`speedgov_cli::run`].

use std::process::ExitCode;

use speedgov_telemetry::{LoggingConfig, init_logging};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = init_logging(&LoggingConfig::default()) {
        eprintln!("warning: failed to initialise logging: {err}");
    }
    ExitCode::from(speedgov_cli::run().await)
}
