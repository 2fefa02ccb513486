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

//! Postgres-backed implementation of [`speedgov_ports::Store`]: embedded
//! migrations, row projections, and the upserts the governor and
//! auto-remove loops depend on.

pub mod error;
pub mod store;

pub use error::DataError;
pub use store::PgStore;
