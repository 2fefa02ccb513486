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

//! Engine-agnostic ports the governor and auto-remove loops are built
//! against: a BitTorrent client driver, a tracker site scraper, persistent
//! storage, and a best-effort notifier. [`testing`] provides in-memory fakes
//! of each, for use by the engine crates' own test suites.

pub mod client;
pub mod notifier;
pub mod scraper;
pub mod store;
pub mod testing;

pub use client::{ClientDriver, ClientError, DeleteOutcome, QbInstance, TorrentInfo};
pub use notifier::Notifier;
pub use scraper::{ScraperError, SiteHelper, SiteScraper};
pub use store::{LogLevel, Store, StoreError};
