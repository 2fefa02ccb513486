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

//! Engine-agnostic control theory and domain types for the precision upload
//! governor: the PID controller, the constant-acceleration Kalman filter,
//! per-torrent state, site rule matching, and the rate computation that ties
//! them together. Nothing in this crate performs I/O.

pub mod error;
pub mod format;
pub mod kalman;
pub mod limit;
pub mod oracle;
pub mod pid;
pub mod rules;
pub mod state;

pub use error::CoreError;
pub use kalman::KalmanFilter;
pub use limit::{LimitDecision, compute_limit};
pub use oracle::{ReannounceSource, reconcile_reannounce};
pub use pid::{PhaseParams, PidController, pid_params};
pub use rules::{PtSite, SiteRule, find_rule};
pub use state::{Phase, TorrentLimitState};

/// Minimum upload rate limit ever applied, in bytes/s.
pub const MIN_LIMIT: i64 = 4096;
/// Maximum upload rate limit ever applied, in bytes/s.
pub const MAX_LIMIT: i64 = 500 * 1024 * 1024;
/// Sentinel value meaning "no cap" when pushed to the client driver.
pub const UNCAPPED: i64 = -1;
