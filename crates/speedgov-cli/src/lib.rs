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
//! Administrative CLI for inspecting and driving a speedgov installation
//! without reimplementing any of its control logic.
//!
//! Layout: `cli.rs` (argument parsing, command dispatch, output rendering)
//! with a thin `main.rs` that delegates to [`cli::run`].

/// Argument parsing, command dispatch, and output rendering.
pub mod cli;

pub use cli::run;
