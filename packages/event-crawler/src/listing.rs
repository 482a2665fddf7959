//! Pagination controller for the playlist listing API.
//!
//! One invocation handles one listing response: it computes which item
//! links become detail requests under the run's cap and decides whether a
//! follow-up listing request is needed. The cap policy is **bounded**:
//! `cap = min(reported_total, query.size)`, so the caller's requested size
//! wins over whatever the server says it could return.

use indexmap::IndexSet;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{ListingItem, ListingPage, ListingQuery, PageRequest};

/// What one listing page turns into.
#[derive(Debug, Default)]
pub struct ListingOutcome {
    /// One detail request per unique resolved item link, in page order
    pub detail_requests: Vec<PageRequest>,
    /// The follow-up listing request, when the chain continues
    pub next: Option<PageRequest>,
}

/// Parse a listing response body.
///
/// Lenient by design: a malformed body, a non-array `items`, or junk item
/// entries all degrade to an empty (or partial) page instead of an error.
/// An unreadable page ends the pagination chain through the normal
/// continue condition.
pub fn parse_listing_body(body: &str) -> ListingPage {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(error) => {
            warn!(%error, "listing body is not valid JSON, treating page as empty");
            return ListingPage::default();
        }
    };

    let items = json["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| ListingItem {
                    link: item["link"].as_str().map(str::to_string),
                })
                .collect()
        })
        .unwrap_or_default();

    ListingPage {
        items,
        total: finite_total(&json["playlist"]["total"]),
    }
}

/// The API-reported total, when it is usable as a finite count.
fn finite_total(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)),
        // Some API revisions report the total as a numeric string
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

/// Handle one listing page: emit detail requests for the eligible slice and
/// build the next listing request when the continue condition holds.
pub fn handle_listing_page(
    body: &str,
    base_url: &Url,
    query: &ListingQuery,
) -> ListingOutcome {
    let page = parse_listing_body(body);
    let received = page.items.len() as u64;

    let total = page.total.unwrap_or(received);
    let cap = total.min(query.size);
    let start = query.start;

    // Items past the cap are discarded even if the server returned them.
    let remaining = cap.saturating_sub(start);
    let eligible = &page.items[..page.items.len().min(remaining as usize)];

    let mut links: IndexSet<Url> = IndexSet::new();
    for item in eligible {
        let Some(link) = item.link.as_deref() else {
            continue;
        };
        match base_url.join(link) {
            Ok(resolved) => {
                links.insert(resolved);
            }
            Err(error) => {
                debug!(link, %error, "skipping unresolvable item link");
            }
        }
    }

    let detail_requests: Vec<PageRequest> =
        links.into_iter().map(PageRequest::detail).collect();

    info!(
        total,
        requested = query.size,
        start,
        received,
        enqueued = detail_requests.len(),
        cap,
        url = %base_url,
        "listing page handled"
    );

    // Advance by what the server actually returned; it may send fewer than
    // the page size near the end.
    let next_start = start + received;
    let next = if received > 0 && next_start < cap {
        info!(next_start, cap, "paginating");
        Some(PageRequest::listing(
            base_url.clone(),
            query.advanced_to(next_start),
        ))
    } else {
        info!(start, received, "pagination done");
        None
    };

    ListingOutcome {
        detail_requests,
        next,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DateFacet;
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn base_url() -> Url {
        Url::parse("https://venue.example/api/playlist/json").unwrap()
    }

    fn query(size: u64, start: u64) -> ListingQuery {
        let mut facets = BTreeMap::new();
        facets.insert(
            "195930".to_string(),
            DateFacet {
                start: "2025-07-05T00:00:00+02:00".to_string(),
                end: "2025-08-31T23:59:59+02:00".to_string(),
                available_only: true,
            },
        );
        ListingQuery {
            app_type: "website".to_string(),
            apply_config: true,
            size,
            start,
            conf_id: "23808".to_string(),
            facets,
            random_seed: Uuid::nil(),
        }
    }

    fn listing_body(links: &[&str], total: Option<u64>) -> String {
        let items: Vec<_> = links.iter().map(|link| json!({ "link": link })).collect();
        let mut body = json!({ "items": items });
        if let Some(total) = total {
            body["playlist"] = json!({ "total": total });
        }
        body.to_string()
    }

    #[test]
    fn bounded_scenario_enqueues_page_and_paginates() {
        // input {maxEvents: 50}; server returns 40 of a reported 120
        let links: Vec<String> = (0..40).map(|i| format!("/event/{}", i)).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let body = listing_body(&refs, Some(120));

        let outcome = handle_listing_page(&body, &base_url(), &query(50, 0));

        assert_eq!(outcome.detail_requests.len(), 40);
        assert_eq!(
            outcome.detail_requests[0].url().as_str(),
            "https://venue.example/event/0"
        );
        match outcome.next {
            Some(PageRequest::Listing { url, query }) => {
                assert_eq!(url, base_url());
                assert_eq!(query.start, 40);
                assert_eq!(query.size, 50);
                assert_eq!(query.conf_id, "23808");
            }
            other => panic!("expected a follow-up listing request, got {:?}", other),
        }
    }

    #[test]
    fn follow_up_only_changes_start() {
        let body = listing_body(&["/event/1"], Some(10));
        let original = query(10, 0);
        let outcome = handle_listing_page(&body, &base_url(), &original);
        let next = match outcome.next {
            Some(PageRequest::Listing { query, .. }) => query,
            other => panic!("expected a follow-up listing request, got {:?}", other),
        };
        assert_eq!(next, original.advanced_to(1));
    }

    #[test]
    fn empty_page_terminates_the_chain() {
        let body = listing_body(&[], Some(120));
        let outcome = handle_listing_page(&body, &base_url(), &query(50, 0));
        assert!(outcome.detail_requests.is_empty());
        assert!(outcome.next.is_none());
    }

    #[test]
    fn reaching_the_cap_terminates_the_chain() {
        let links: Vec<String> = (0..10).map(|i| format!("/event/{}", i)).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let body = listing_body(&refs, Some(120));

        // start=40, 10 items: 40 + 10 >= cap 50
        let outcome = handle_listing_page(&body, &base_url(), &query(50, 40));
        assert_eq!(outcome.detail_requests.len(), 10);
        assert!(outcome.next.is_none());
    }

    #[test]
    fn items_past_the_cap_are_discarded() {
        // caller asked for 5, server sent 8
        let links: Vec<String> = (0..8).map(|i| format!("/event/{}", i)).collect();
        let refs: Vec<&str> = links.iter().map(String::as_str).collect();
        let body = listing_body(&refs, Some(20));

        let outcome = handle_listing_page(&body, &base_url(), &query(5, 0));
        assert_eq!(outcome.detail_requests.len(), 5);
        assert!(outcome.next.is_none());
    }

    #[test]
    fn malformed_body_is_an_empty_page() {
        let outcome = handle_listing_page("{not json", &base_url(), &query(50, 0));
        assert!(outcome.detail_requests.is_empty());
        assert!(outcome.next.is_none());
    }

    #[test]
    fn missing_total_falls_back_to_page_length() {
        let body = listing_body(&["/event/1", "/event/2"], None);
        let outcome = handle_listing_page(&body, &base_url(), &query(50, 0));
        // cap = min(2, 50) = 2 and 0 + 2 >= 2, so the chain ends here
        assert_eq!(outcome.detail_requests.len(), 2);
        assert!(outcome.next.is_none());
    }

    #[test]
    fn string_total_is_accepted() {
        let body = json!({
            "items": [{ "link": "/event/1" }],
            "playlist": { "total": "120" }
        })
        .to_string();
        let page = parse_listing_body(&body);
        assert_eq!(page.total, Some(120));
    }

    #[test]
    fn junk_total_falls_back_to_none() {
        let body = json!({
            "items": [{ "link": "/event/1" }],
            "playlist": { "total": "soon" }
        })
        .to_string();
        assert_eq!(parse_listing_body(&body).total, None);
    }

    #[test]
    fn duplicate_links_collapse_after_resolution() {
        // relative and absolute spellings of the same page
        let body = listing_body(
            &[
                "/event/1",
                "https://venue.example/event/1",
                "/event/2",
                "/event/1",
            ],
            Some(10),
        );
        let outcome = handle_listing_page(&body, &base_url(), &query(10, 0));
        let urls: Vec<&str> = outcome
            .detail_requests
            .iter()
            .map(|r| r.url().as_str())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://venue.example/event/1",
                "https://venue.example/event/2"
            ]
        );
    }

    #[test]
    fn linkless_items_still_advance_the_offset() {
        let body = json!({
            "items": [
                { "link": "/event/1" },
                { "title": "no link here" },
                { "link": "/event/2" }
            ],
            "playlist": { "total": 30 }
        })
        .to_string();

        let outcome = handle_listing_page(&body, &base_url(), &query(30, 0));
        assert_eq!(outcome.detail_requests.len(), 2);
        match outcome.next {
            Some(PageRequest::Listing { query, .. }) => assert_eq!(query.start, 3),
            other => panic!("expected a follow-up listing request, got {:?}", other),
        }
    }

    #[test]
    fn reprocessing_a_page_is_deterministic() {
        let body = listing_body(&["/event/1", "/event/2"], Some(120));
        let q = query(50, 0);
        let first = handle_listing_page(&body, &base_url(), &q);
        let second = handle_listing_page(&body, &base_url(), &q);

        let keys = |outcome: &ListingOutcome| {
            outcome
                .detail_requests
                .iter()
                .map(|r| r.dedupe_key())
                .collect::<Vec<_>>()
        };
        assert_eq!(keys(&first), keys(&second));
        assert_eq!(
            first.next.map(|r| r.dedupe_key()),
            second.next.map(|r| r.dedupe_key())
        );
    }
}
