//! Detail-page handler: extract one event record from the JSON-LD blocks
//! embedded in an event's webpage.
//!
//! Extraction works only on structured data (`application/ld+json` script
//! blocks), never on HTML layout. A page with no usable Event node yields
//! no record and does not fail the run.

use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::types::EventRecord;

/// First-seen nodes per expected type tag, across all blocks in document
/// order.
#[derive(Debug, Default)]
pub struct GraphNodes {
    pub event: Option<Value>,
    pub web_page: Option<Value>,
}

impl GraphNodes {
    fn is_complete(&self) -> bool {
        self.event.is_some() && self.web_page.is_some()
    }
}

/// Scan every `<script type="application/ld+json">` block for the first
/// Event-typed and first WebPage-typed graph node.
///
/// Malformed blocks are skipped. Scanning stops early once both kinds have
/// been found.
pub fn scan_structured_data(html: &str) -> GraphNodes {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("static selector is valid");

    let mut nodes = GraphNodes::default();

    for block in document.select(&selector) {
        let text: String = block.text().collect();
        let raw: Value = match serde_json::from_str(&text) {
            Ok(raw) => raw,
            Err(error) => {
                debug!(%error, "skipping malformed ld+json block");
                continue;
            }
        };

        if let Some(graph) = raw["@graph"].as_array() {
            for node in graph {
                match node["@type"].as_str() {
                    Some("Event") if nodes.event.is_none() => {
                        nodes.event = Some(node.clone());
                    }
                    Some("WebPage") if nodes.web_page.is_none() => {
                        nodes.web_page = Some(node.clone());
                    }
                    _ => {}
                }
                if nodes.is_complete() {
                    break;
                }
            }
        }

        if nodes.is_complete() {
            break;
        }
    }

    nodes
}

/// Extract a cleaned event record from a detail page.
///
/// Returns None (a logged skip, not an error) when the page carries no
/// Event node. The WebPage node, when present, backfills url, name and
/// description.
pub fn handle_detail_page(html: &str, request_url: &Url) -> Option<EventRecord> {
    let GraphNodes { event, web_page } = scan_structured_data(html);

    let Some(event) = event else {
        warn!(url = %request_url, "no Event schema found");
        return None;
    };
    let web_page = web_page.unwrap_or(Value::Null);

    let record = EventRecord {
        url: str_at(&event, &["url"])
            .or_else(|| str_at(&web_page, &["url"]))
            .unwrap_or_else(|| request_url.to_string()),
        name: str_at(&event, &["name"]).or_else(|| str_at(&web_page, &["headline"])),
        description: str_at(&event, &["description"])
            .or_else(|| str_at(&web_page, &["description"])),
        start_date: str_at(&event, &["startDate"]),
        end_date: str_at(&event, &["endDate"]),
        venue: str_at(&event, &["location", "name"]),
        address: str_at(&event, &["location", "address", "streetAddress"]),
        city: str_at(&event, &["location", "address", "addressLocality"]),
        postal_code: str_at(&event, &["location", "address", "postalCode"]),
        latitude: num_at(&event, &["location", "geo", "latitude"]),
        longitude: num_at(&event, &["location", "geo", "longitude"]),
        images: images_at(&event, &["image"]),
    };

    Some(record.pruned())
}

/// String value at a nested path.
fn str_at(node: &Value, path: &[&str]) -> Option<String> {
    value_at(node, path).as_str().map(str::to_string)
}

/// Numeric value at a nested path; numeric strings are coerced.
fn num_at(node: &Value, path: &[&str]) -> Option<f64> {
    let value = value_at(node, path);
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|f| f.is_finite())
}

/// Image list at a nested path: an array of URL strings, or a single
/// string treated as a one-element list.
fn images_at(node: &Value, path: &[&str]) -> Option<Vec<String>> {
    match value_at(node, path) {
        Value::Array(values) => Some(
            values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
        ),
        Value::String(s) => Some(vec![s.clone()]),
        _ => None,
    }
}

fn value_at<'a>(node: &'a Value, path: &[&str]) -> &'a Value {
    let mut current = node;
    for key in path {
        current = &current[*key];
    }
    current
}
