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
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! The auto-removal rule engine: a configurable-cadence loop that evaluates
//! every enabled client instance's torrents against the stored remove rules
//! (first match wins) and deletes the ones that match.
//!
//! Layout: `signal.rs` (cooperative stop signal, mirroring
//! `speedgov-governor`), `config.rs` (bounded runtime configuration reloaded
//! every iteration), `engine.rs` (task lifecycle, tick logic, and public
//! control surface), `status.rs` (inspection DTOs), `error.rs` (lifecycle
//! error type).

pub mod config;
pub mod engine;
pub mod error;
pub mod signal;
pub mod status;

pub use config::AutoRemoveConfig;
pub use engine::AutoRemoveEngine;
pub use error::{AutoRemoveError, AutoRemoveResult};
pub use signal::StopSignal;
pub use status::{AutoRemoveStatus, ManualCheckOutcome};
