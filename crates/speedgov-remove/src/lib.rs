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

//! Auto-remove rule conditions, matching, and the ring-buffered removal
//! history they produce.

pub mod condition;
pub mod record;
pub mod rule;

pub use condition::{RemoveCondition, TorrentSnapshot};
pub use record::{RemoveRecord, RemoveRecordRing};
pub use rule::{RemoveRule, match_rules};
