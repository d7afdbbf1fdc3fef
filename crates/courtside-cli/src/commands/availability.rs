//! `courtside availability`

use std::sync::Arc;

use chrono::{Datelike, Local};
use courtside_engine::{AvailabilityCache, AvailabilityFetcher, FsBlobStore, MonthlyCrawler};
use courtside_providers::AbortHandle;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Prints the month's snapshot, crawling the sites when the cached copy is
/// missing, stale, or `refresh` is set.
pub async fn run(
    config: &ClientConfig,
    year: Option<i32>,
    month: Option<u32>,
    refresh: bool,
    abort: AbortHandle,
) -> ClientResult<()> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());

    let directory = Arc::new(config.directory());
    let providers = config.providers(&directory).map_err(ClientError::Config)?;
    let credentials = config.credentials().map_err(ClientError::Config)?;

    let cache_dir = config.cache_dir();
    info!(dir = %cache_dir.display(), "Using snapshot cache");
    let crawler = MonthlyCrawler::new(
        providers,
        AvailabilityCache::new(Arc::new(FsBlobStore::new(cache_dir))),
        AvailabilityFetcher::new(config.crawl_config()),
    );

    let report = crawler
        .load_month(&credentials, year, month, refresh, abort)
        .await?;

    for gap in &report.gaps {
        eprintln!(
            "warning: region {} {} not fetched: {}",
            gap.region,
            gap.date,
            gap.error.user_message()
        );
    }
    super::print_json(&report.snapshot)
}
