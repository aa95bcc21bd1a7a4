//! Extraction-and-persistence core of an Avito rental-listings monitor.
//!
//! The fetch layer hands this crate a rendered page of markup; the crate
//! turns it into typed [`Listing`] records, persists them idempotently by
//! link, and reports [`RunStats`] for the pass. The reporting layer reads
//! the same [`ListingStore`] independently of any scrape.

pub mod extract;
pub mod models;
pub mod processor;
pub mod store;

pub use extract::{AvitoExtractor, SiteExtractor};
pub use models::{Listing, ListingSummary, RunStats, StoredListing};
pub use processor::Processor;
pub use store::ListingStore;
