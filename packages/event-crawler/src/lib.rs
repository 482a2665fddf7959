//! Venue events crawler.
//!
//! Fetches an events listing from a venue's paginated playlist API,
//! follows each event's detail page, extracts JSON-LD event records, and
//! emits a deduplicated, cleaned dataset.
//!
//! # Design
//!
//! - Pagination state is a typed query carried in each queue entry and
//!   advanced by cloning, never recovered by re-parsing a stored body.
//! - The cap on collected items is bounded: `min(reported_total,
//!   requested_size)`.
//! - Detail pages that lack usable structured data are skipped, never
//!   fatal.
//! - The queue's dedupe contract (SHA-256 over method + URL + body) makes
//!   re-processing and resuming idempotent.
//!
//! # Modules
//!
//! - [`config`] - Run input, site constants, date facet window
//! - [`types`] - Requests, dedupe keys, wire types, the event record
//! - [`listing`] - Pagination controller
//! - [`detail`] - JSON-LD record extractor
//! - [`queue`] - Traversal queue (memory and SQLite backends)
//! - [`sink`] - Append-only output dataset
//! - [`fetch`] - HTTP fetch collaborator
//! - [`crawler`] - The worker loop

pub mod config;
pub mod crawler;
pub mod detail;
pub mod error;
pub mod fetch;
pub mod listing;
pub mod queue;
pub mod sink;
pub mod types;

// Re-export core types at crate root
pub use config::{initial_request, RunInput, SiteConfig};
pub use crawler::{Crawler, RunStats};
pub use detail::handle_detail_page;
pub use error::{CrawlerError, FetchError, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use listing::{handle_listing_page, ListingOutcome};
pub use queue::{MemoryQueue, RequestQueue, SqliteQueue};
pub use sink::{Dataset, JsonlDataset, MemoryDataset};
pub use types::{DedupeKey, EventRecord, ListingQuery, PageRequest};
