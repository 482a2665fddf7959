//! Domain types: queued page requests, the listing wire format, and the
//! extracted event record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

/// Derived identity for a queued request.
///
/// Computed from method + URL + canonical JSON body, so re-enqueuing the
/// same listing offset (or the same detail URL) is a no-op at the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupeKey(String);

impl DedupeKey {
    fn compute(method: &str, url: &Url, body: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(method.as_bytes());
        hasher.update(b" ");
        hasher.update(url.as_str().as_bytes());
        hasher.update(b"\n");
        hasher.update(body.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Date-range facet sent to the playlist API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateFacet {
    /// ISO-8601 datetime, start of the window
    pub start: String,
    /// ISO-8601 datetime, end of the window
    pub end: String,
    pub available_only: bool,
}

/// POST body for one listing page.
///
/// This is also the pagination state: `start` and `size` are typed fields
/// threaded forward by clone-and-advance, never recovered by re-parsing a
/// stored raw body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub app_type: String,
    pub apply_config: bool,
    /// How many items the caller wants in total (the cap input)
    pub size: u64,
    /// Offset of the first item of this page
    pub start: u64,
    pub conf_id: String,
    /// BTreeMap keeps facet serialization canonical for dedupe hashing
    pub facets: BTreeMap<String, DateFacet>,
    /// Constant for the whole run; keeps the server-side shuffle stable
    /// across pages
    pub random_seed: Uuid,
}

impl ListingQuery {
    /// The same query pointed at the next page.
    pub fn advanced_to(&self, start: u64) -> Self {
        let mut next = self.clone();
        next.start = start;
        next
    }
}

/// A unit of work in the traversal queue.
///
/// Immutable once enqueued. Serde round-trips so the durable queue can
/// persist entries as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "label", rename_all = "snake_case")]
pub enum PageRequest {
    /// One page of the paginated search API (POST)
    Listing { url: Url, query: ListingQuery },
    /// An event's own webpage (GET)
    Detail { url: Url },
}

impl PageRequest {
    pub fn listing(url: Url, query: ListingQuery) -> Self {
        Self::Listing { url, query }
    }

    pub fn detail(url: Url) -> Self {
        Self::Detail { url }
    }

    pub fn url(&self) -> &Url {
        match self {
            Self::Listing { url, .. } => url,
            Self::Detail { url } => url,
        }
    }

    /// Request label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Listing { .. } => "listing",
            Self::Detail { .. } => "detail",
        }
    }

    /// Identity used by the queue's dedupe contract.
    pub fn dedupe_key(&self) -> DedupeKey {
        match self {
            Self::Listing { url, query } => {
                // Struct fields and BTreeMap keys serialize in a fixed
                // order, so this string is canonical for a given query.
                let body = serde_json::to_string(query).unwrap_or_default();
                DedupeKey::compute("POST", url, &body)
            }
            Self::Detail { url } => DedupeKey::compute("GET", url, ""),
        }
    }
}

/// One item of a listing page. Anything beyond the detail link is ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingItem {
    pub link: Option<String>,
}

/// A parsed listing response: the item slice plus the API-reported total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub items: Vec<ListingItem>,
    /// `playlist.total` when it was a finite number (numeric strings
    /// accepted), otherwise None
    pub total: Option<u64>,
}

/// A cleaned event record, one line of the output dataset.
///
/// Absent fields are omitted from the serialized form, not emitted as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl EventRecord {
    /// Drop empty sequences so the sink never carries placeholder values.
    ///
    /// Pure constructor-style cleanup: the output only holds present
    /// fields. `name` may still be None here (it was the one field allowed
    /// to be explicitly null in the working record); after pruning it is
    /// simply omitted like the rest.
    pub fn pruned(mut self) -> Self {
        if matches!(&self.images, Some(images) if images.is_empty()) {
            self.images = None;
        }
        self
    }
}
