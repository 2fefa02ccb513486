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

//! The precision upload-rate governor: a 5-second tick loop over every
//! enabled client instance's seeding torrents, computing and applying
//! per-torrent upload limits via [`speedgov_core::compute_limit`].
//!
//! Layout: `signal.rs` (cooperative stop signal), `state_table.rs` (shared
//! per-torrent state), `oracle_probe.rs` (I/O-backed reannounce source
//! probing), `tick.rs` (one tick's classification and per-torrent work),
//! `engine.rs` (task lifecycle and public control surface), `status.rs`
//! (inspection DTOs), `error.rs` (lifecycle error type).

pub mod engine;
pub mod error;
pub mod oracle_probe;
pub mod signal;
pub mod state_table;
pub mod status;
pub mod tick;

pub use engine::{Clock, GovernorEngine, SystemClock};
pub use error::{GovernorError, GovernorResult};
pub use signal::StopSignal;
pub use state_table::StateTable;
pub use status::{GovernorStatus, TorrentStateSnapshot};
