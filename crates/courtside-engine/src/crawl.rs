//! Monthly crawl: log in to every region, fetch the whole month, merge and
//! cache the snapshot.

use chrono::{Datelike, NaiveDate};
use courtside_core::{CredentialSet, Region};
use courtside_providers::{AbortHandle, CourtProvider, ProviderError};
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::cache::{AvailabilityCache, CacheSnapshot, now_ms};
use crate::error::{EngineError, EngineResult};
use crate::fetcher::{Availability, AvailabilityFetcher, DateGap};
use crate::registry::ProviderSet;
use crate::retry::retry;

/// Every date of a month, in order.
pub fn dates_in_month(year: i32, month: u32) -> EngineResult<Vec<NaiveDate>> {
    let first =
        NaiveDate::from_ymd_opt(year, month, 1).ok_or(EngineError::InvalidMonth { year, month })?;
    Ok(first
        .iter_days()
        .take_while(|d| d.month() == month)
        .collect())
}

/// Result of [`MonthlyCrawler::load_month`].
#[derive(Debug)]
pub struct MonthReport {
    pub snapshot: CacheSnapshot,
    /// Dates that could not be fetched; empty when served from cache.
    pub gaps: Vec<DateGap>,
    pub from_cache: bool,
}

/// Produces monthly snapshots, from the cache when fresh.
pub struct MonthlyCrawler {
    providers: ProviderSet,
    cache: AvailabilityCache,
    fetcher: AvailabilityFetcher,
}

impl MonthlyCrawler {
    pub fn new(providers: ProviderSet, cache: AvailabilityCache, fetcher: AvailabilityFetcher) -> Self {
        Self {
            providers,
            cache,
            fetcher,
        }
    }

    pub fn cache(&self) -> &AvailabilityCache {
        &self.cache
    }

    /// Returns the month's snapshot, crawling live when the cache has no
    /// fresh copy or `force` is set.
    pub async fn load_month(
        &self,
        credentials: &CredentialSet,
        year: i32,
        month: u32,
        force: bool,
        abort: AbortHandle,
    ) -> EngineResult<MonthReport> {
        if !force {
            if let Some(snapshot) = self.cache.get_fresh(year, month, now_ms()).await? {
                info!(year, month, records = snapshot.len(), "Serving cached snapshot");
                return Ok(MonthReport {
                    snapshot,
                    gaps: Vec::new(),
                    from_cache: true,
                });
            }
        }
        self.refresh_month(credentials, year, month, abort).await
    }

    /// Crawls the month live and stores the merged snapshot.
    ///
    /// Regions are crawled concurrently. A region whose login fails
    /// contributes a gap for every date; an abort stores nothing.
    pub async fn refresh_month(
        &self,
        credentials: &CredentialSet,
        year: i32,
        month: u32,
        abort: AbortHandle,
    ) -> EngineResult<MonthReport> {
        let dates = dates_in_month(year, month)?;
        info!(year, month, days = dates.len(), "Crawling month");

        let crawls = self.providers.regions().filter_map(|region| {
            let provider = self.providers.get(region)?;
            match credentials.for_region(region) {
                Some(credential) => Some(self.crawl_region(
                    provider.as_ref(),
                    credential,
                    &dates,
                    abort.clone(),
                )),
                None => {
                    warn!(region = %region, "No credential; region left out of snapshot");
                    None
                }
            }
        });

        let mut merged = Availability::default();
        for availability in join_all(crawls).await {
            merged.merge(availability);
        }
        abort.check("storing snapshot")?;

        let snapshot = CacheSnapshot::from_reservations(year, month, now_ms(), merged.reservations);
        self.cache.put(year, month, &snapshot).await?;
        info!(
            year,
            month,
            records = snapshot.len(),
            gaps = merged.gaps.len(),
            "Stored crawled snapshot"
        );

        Ok(MonthReport {
            snapshot,
            gaps: merged.gaps,
            from_cache: false,
        })
    }

    async fn crawl_region(
        &self,
        provider: &dyn CourtProvider,
        credential: &courtside_core::Credential,
        dates: &[NaiveDate],
        abort: AbortHandle,
    ) -> Availability {
        let policy = &self.fetcher.config().retry;
        let login = retry(policy, &abort, "login", || {
            provider.login(credential, abort.clone())
        })
        .await;

        match login {
            Ok(session) => self.fetcher.fetch(provider, &session, dates).await,
            Err(error) => {
                warn!(region = %provider.region(), error = %error, "Crawl login failed");
                region_gaps(provider.region(), dates, &error)
            }
        }
    }
}

fn region_gaps(region: Region, dates: &[NaiveDate], error: &ProviderError) -> Availability {
    Availability {
        reservations: Vec::new(),
        gaps: dates
            .iter()
            .map(|&date| DateGap {
                region,
                date,
                error: error.detached(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_lengths() {
        assert_eq!(dates_in_month(2025, 2).unwrap().len(), 28);
        assert_eq!(dates_in_month(2024, 2).unwrap().len(), 29);
        assert_eq!(dates_in_month(2025, 12).unwrap().len(), 31);
        let may = dates_in_month(2025, 5).unwrap();
        assert_eq!(may.first().unwrap().day(), 1);
        assert_eq!(may.last().unwrap().day(), 31);
    }

    #[test]
    fn invalid_month() {
        assert!(matches!(
            dates_in_month(2025, 13),
            Err(EngineError::InvalidMonth { month: 13, .. })
        ));
        assert!(dates_in_month(2025, 0).is_err());
    }
}
