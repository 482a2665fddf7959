//! Run configuration: caller input, site constants, and the date facet
//! window sent with every listing request.

use chrono::{DateTime, Datelike, Days, Local, Months, NaiveDate, NaiveTime, SecondsFormat};
use std::collections::BTreeMap;
use url::Url;
use uuid::Uuid;

use crate::error::{CrawlerError, Result};
use crate::types::{DateFacet, ListingQuery, PageRequest};

/// Playlist endpoint for the venue website (conf id baked into the path).
const DEFAULT_ENDPOINT: &str =
    "https://vichymonamour.fr/api/render/website_v2/vichy/playlist/23808/fr_FR/json";

/// Content configuration id of the events playlist.
const DEFAULT_CONF_ID: &str = "23808";

/// Facet id of the event date-range filter.
const DEFAULT_DATE_FACET_ID: &str = "195930";

/// Caller input for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInput {
    /// How many items to request in one shot. Default: 1000.
    pub max_events: u64,

    /// How far into the future the date facet reaches, in months.
    /// Default: 3.
    pub months_ahead: u32,
}

impl Default for RunInput {
    fn default() -> Self {
        Self {
            max_events: 1000,
            months_ahead: 3,
        }
    }
}

/// The venue site being crawled: listing endpoint plus the ids the API
/// expects in the POST body.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub endpoint: Url,
    pub conf_id: String,
    pub date_facet_id: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            conf_id: DEFAULT_CONF_ID.to_string(),
            date_facet_id: DEFAULT_DATE_FACET_ID.to_string(),
        }
    }
}

impl SiteConfig {
    /// Replace the listing endpoint (e.g. from a CLI override).
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }
}

/// The date facet window: start of today through the end of the month
/// `months_ahead` months forward, in the local timezone.
pub fn date_window(
    now: DateTime<Local>,
    months_ahead: u32,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let today = now.date_naive();
    let start = local_datetime(today, NaiveTime::MIN)?;

    let target = today
        .checked_add_months(Months::new(months_ahead))
        .ok_or_else(|| CrawlerError::Config {
            reason: format!("months_ahead={} overflows the calendar", months_ahead),
        })?;
    let month_first =
        NaiveDate::from_ymd_opt(target.year(), target.month(), 1).ok_or_else(|| {
            CrawlerError::Config {
                reason: format!("no first day for {}-{}", target.year(), target.month()),
            }
        })?;
    let month_last = month_first
        .checked_add_months(Months::new(1))
        .and_then(|d| d.checked_sub_days(Days::new(1)))
        .ok_or_else(|| CrawlerError::Config {
            reason: format!("no last day for {}-{}", target.year(), target.month()),
        })?;

    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).expect("23:59:59 is a valid time");
    let end = local_datetime(month_last, end_of_day)?;

    Ok((start, end))
}

/// Resolve a naive date+time in the local timezone, tolerating DST folds.
fn local_datetime(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Local>> {
    let naive = date.and_time(time);
    naive
        .and_local_timezone(Local)
        .earliest()
        .or_else(|| naive.and_local_timezone(Local).latest())
        .ok_or_else(|| CrawlerError::Config {
            reason: format!("{} does not exist in the local timezone", naive),
        })
}

/// Build the listing request that seeds the traversal queue.
///
/// `start` is 0 and `size` is the caller's `max_events`; every later page
/// derives from this query by advancing `start`.
pub fn initial_request(
    site: &SiteConfig,
    input: &RunInput,
    now: DateTime<Local>,
) -> Result<PageRequest> {
    let (window_start, window_end) = date_window(now, input.months_ahead)?;

    let mut facets = BTreeMap::new();
    facets.insert(
        site.date_facet_id.clone(),
        DateFacet {
            start: window_start.to_rfc3339_opts(SecondsFormat::Secs, false),
            end: window_end.to_rfc3339_opts(SecondsFormat::Secs, false),
            available_only: true,
        },
    );

    let query = ListingQuery {
        app_type: "website".to_string(),
        apply_config: true,
        size: input.max_events,
        start: 0,
        conf_id: site.conf_id.clone(),
        facets,
        random_seed: Uuid::new_v4(),
    };

    Ok(PageRequest::listing(site.endpoint.clone(), query))
}
