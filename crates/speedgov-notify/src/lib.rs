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

//! Telegram-backed [`speedgov_ports::Notifier`]: `notify` enqueues onto a
//! bounded channel and returns immediately, a single background task drains
//! it and posts to the Telegram Bot API.

mod telegram;

pub use telegram::{TelegramNotifier, spawn};
