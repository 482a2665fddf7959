//! The worker loop: pull one request at a time from the traversal queue,
//! dispatch on its label, and feed spawned work back through the queue's
//! dedupe contract.
//!
//! Handlers share no mutable state; everything a request needs rides in
//! the request itself, and everything it produces goes to the queue or the
//! sink. A cancelled run resumes safely because unhandled entries are
//! re-served and re-submission is idempotent.

use tracing::{debug, info, warn};

use crate::detail::handle_detail_page;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::listing::handle_listing_page;
use crate::queue::RequestQueue;
use crate::sink::Dataset;
use crate::types::PageRequest;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Listing pages processed
    pub listing_pages: u64,
    /// Detail requests newly enqueued (dedupe hits excluded)
    pub details_enqueued: u64,
    /// Event records written to the sink
    pub records: u64,
    /// Pages skipped: fetch failures and detail pages with no Event node
    pub skipped: u64,
}

/// Ties fetcher, queue and sink into one crawl run.
pub struct Crawler<F, Q, D> {
    fetcher: F,
    queue: Q,
    sink: D,
}

impl<F, Q, D> Crawler<F, Q, D>
where
    F: Fetcher,
    Q: RequestQueue,
    D: Dataset,
{
    pub fn new(fetcher: F, queue: Q, sink: D) -> Self {
        Self {
            fetcher,
            queue,
            sink,
        }
    }

    /// Submit the run's seed request. Returns false when the queue already
    /// knows it (a resumed run).
    pub async fn seed(&self, request: &PageRequest) -> Result<bool> {
        self.queue.submit(request).await
    }

    /// Drain the queue. Terminates when no unhandled request remains.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        while let Some(request) = self.queue.next().await? {
            let key = request.dedupe_key();

            match self.fetcher.fetch(&request).await {
                Ok(body) => self.handle_response(&request, &body, &mut stats).await?,
                Err(error) => {
                    // Retry/backoff is the fetch layer's business; a fetch
                    // that still failed is a skip, not a run failure.
                    warn!(url = %request.url(), label = request.label(), %error, "fetch failed, skipping");
                    stats.skipped += 1;
                }
            }

            self.queue.mark_handled(&key).await?;
        }

        info!(
            listing_pages = stats.listing_pages,
            details_enqueued = stats.details_enqueued,
            records = stats.records,
            skipped = stats.skipped,
            "crawl complete"
        );
        Ok(stats)
    }

    async fn handle_response(
        &self,
        request: &PageRequest,
        body: &str,
        stats: &mut RunStats,
    ) -> Result<()> {
        match request {
            PageRequest::Listing { url, query } => {
                stats.listing_pages += 1;
                let outcome = handle_listing_page(body, url, query);

                for detail in &outcome.detail_requests {
                    if self.queue.submit(detail).await? {
                        stats.details_enqueued += 1;
                    } else {
                        debug!(url = %detail.url(), "detail request already enqueued");
                    }
                }
                if let Some(next) = &outcome.next {
                    self.queue.submit(next).await?;
                }
            }
            PageRequest::Detail { url } => match handle_detail_page(body, url) {
                Some(record) => {
                    info!(url = %url, name = record.name.as_deref().unwrap_or("(unnamed)"), "saved event");
                    self.sink.push(&record).await?;
                    stats.records += 1;
                }
                None => {
                    stats.skipped += 1;
                }
            },
        }
        Ok(())
    }
}
