//! In-memory fakes of every port, for the governor and auto-remove loops'
//! own test suites. None of these talk to the network or a database.

mod client;
mod notifier;
mod scraper;
mod store;

pub use client::FakeClientDriver;
pub use notifier::FakeNotifier;
pub use scraper::{FakeSiteHelper, FakeSiteScraper};
pub use store::FakeStore;
