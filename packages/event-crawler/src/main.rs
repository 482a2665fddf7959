// Entry point for the venue events crawler

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use event_crawler::{
    initial_request, Crawler, HttpFetcher, JsonlDataset, MemoryQueue, RunInput, SiteConfig,
    SqliteQueue,
};

#[derive(Debug, Parser)]
#[command(name = "event-crawler", about = "Crawl a venue's events playlist into a JSONL dataset")]
struct Args {
    /// How many events to request in one shot
    #[arg(long, default_value_t = 1000)]
    max_events: u64,

    /// How far into the future the date filter reaches, in months
    #[arg(long, default_value_t = 3)]
    months_ahead: u32,

    /// Output dataset file (JSON lines, appended)
    #[arg(long, default_value = "events.jsonl")]
    output: String,

    /// SQLite queue database for resumable runs (in-memory queue when
    /// omitted)
    #[arg(long)]
    queue_db: Option<String>,

    /// Override the playlist endpoint
    #[arg(long)]
    endpoint: Option<Url>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,event_crawler=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut site = SiteConfig::default();
    if let Some(endpoint) = args.endpoint {
        site = site.with_endpoint(endpoint);
    }
    let input = RunInput {
        max_events: args.max_events,
        months_ahead: args.months_ahead,
    };

    tracing::info!(
        endpoint = %site.endpoint,
        max_events = input.max_events,
        months_ahead = input.months_ahead,
        output = %args.output,
        "starting crawl"
    );

    let seed = initial_request(&site, &input, chrono::Local::now())
        .context("Failed to build the initial listing request")?;

    let fetcher = HttpFetcher::new();
    let sink = JsonlDataset::open(&args.output)
        .await
        .with_context(|| format!("Failed to open output file {}", args.output))?;

    let stats = match args.queue_db {
        Some(db) => {
            let url = format!("sqlite:{}?mode=rwc", db);
            let queue = SqliteQueue::new(&url)
                .await
                .with_context(|| format!("Failed to open queue database {}", db))?;
            let crawler = Crawler::new(fetcher, queue, sink);
            if !crawler.seed(&seed).await? {
                tracing::info!("seed request already in the queue, resuming");
            }
            crawler.run().await?
        }
        None => {
            let crawler = Crawler::new(fetcher, MemoryQueue::new(), sink);
            crawler.seed(&seed).await?;
            crawler.run().await?
        }
    };

    tracing::info!(
        listing_pages = stats.listing_pages,
        details_enqueued = stats.details_enqueued,
        records = stats.records,
        skipped = stats.skipped,
        output = %args.output,
        "done"
    );
    Ok(())
}
