//! Availability fetching with per-date degradation.
//!
//! Batched providers get one request for all dates; per-date providers get a
//! bounded pool of concurrent requests. Either way a failing date becomes a
//! [`DateGap`] and the remaining dates still return.

use chrono::NaiveDate;
use courtside_core::{Region, Reservation};
use courtside_providers::{CourtProvider, FetchMode, ProviderError, SessionState};
use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::retry::{RetryPolicy, retry};

/// Fetch and crawl settings.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Concurrent requests for per-date providers.
    pub concurrency: usize,
    /// Retry policy for each request.
    pub retry: RetryPolicy,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

impl CrawlConfig {
    pub const DEFAULT_CONCURRENCY: usize = 4;
    pub const MIN_CONCURRENCY: usize = 3;
    pub const MAX_CONCURRENCY: usize = 5;

    /// Builder: set the worker count, clamped to 3..=5.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(Self::MIN_CONCURRENCY, Self::MAX_CONCURRENCY);
        self
    }

    /// Builder: set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn workers(&self) -> usize {
        self.concurrency
            .clamp(Self::MIN_CONCURRENCY, Self::MAX_CONCURRENCY)
    }
}

/// A date that could not be fetched.
#[derive(Debug)]
pub struct DateGap {
    pub region: Region,
    pub date: NaiveDate,
    pub error: ProviderError,
}

/// Fetch result: the records that were retrieved plus the dates that were
/// not.
#[derive(Debug, Default)]
pub struct Availability {
    pub reservations: Vec<Reservation>,
    pub gaps: Vec<DateGap>,
}

impl Availability {
    /// Returns true if every date was fetched.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Appends another result.
    pub fn merge(&mut self, other: Availability) {
        self.reservations.extend(other.reservations);
        self.gaps.extend(other.gaps);
    }
}

/// Retrieves normalized availability through a logged-in session.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityFetcher {
    config: CrawlConfig,
}

impl AvailabilityFetcher {
    pub fn new(config: CrawlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fetches `dates` using the strategy the provider asks for.
    pub async fn fetch(
        &self,
        provider: &dyn CourtProvider,
        session: &SessionState,
        dates: &[NaiveDate],
    ) -> Availability {
        let availability = match provider.fetch_mode() {
            FetchMode::Batched => self.fetch_batched(provider, session, dates).await,
            FetchMode::PerDate => self.fetch_per_date(provider, session, dates).await,
        };

        for gap in &availability.gaps {
            warn!(region = %gap.region, date = %gap.date, error = %gap.error, "Availability gap");
        }
        debug!(
            region = %provider.region(),
            dates = dates.len(),
            records = availability.reservations.len(),
            gaps = availability.gaps.len(),
            "Fetched availability"
        );
        availability
    }

    async fn fetch_batched(
        &self,
        provider: &dyn CourtProvider,
        session: &SessionState,
        dates: &[NaiveDate],
    ) -> Availability {
        let result = retry(
            &self.config.retry,
            session.abort_handle(),
            "availability",
            || provider.fetch_dates(session, dates),
        )
        .await;

        match result {
            Ok(reservations) => Availability {
                reservations,
                gaps: Vec::new(),
            },
            Err(error) => Availability {
                reservations: Vec::new(),
                gaps: dates
                    .iter()
                    .map(|&date| DateGap {
                        region: provider.region(),
                        date,
                        error: error.detached(),
                    })
                    .collect(),
            },
        }
    }

    async fn fetch_per_date(
        &self,
        provider: &dyn CourtProvider,
        session: &SessionState,
        dates: &[NaiveDate],
    ) -> Availability {
        let policy = &self.config.retry;
        let results: Vec<_> = stream::iter(dates.iter().copied())
            .map(|date| async move {
                let one = [date];
                let result = retry(policy, session.abort_handle(), "availability", || {
                    provider.fetch_dates(session, &one)
                })
                .await;
                (date, result)
            })
            .buffered(self.config.workers())
            .collect()
            .await;

        let mut availability = Availability::default();
        for (date, result) in results {
            match result {
                Ok(rows) => availability.reservations.extend(rows),
                Err(error) => availability.gaps.push(DateGap {
                    region: provider.region(),
                    date,
                    error,
                }),
            }
        }
        availability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_is_clamped() {
        assert_eq!(CrawlConfig::default().concurrency, 4);
        assert_eq!(CrawlConfig::default().with_concurrency(1).concurrency, 3);
        assert_eq!(CrawlConfig::default().with_concurrency(16).concurrency, 5);
        let raw = CrawlConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert_eq!(raw.workers(), 3);
    }
}
