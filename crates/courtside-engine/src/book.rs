//! Booking orchestration across regions.

use std::collections::BTreeMap;
use std::sync::Arc;

use courtside_core::{CourtDirectory, Credential, CredentialSet, Region, ReservationBatch, TimeSlotRequest};
use courtside_providers::{AbortHandle, CourtProvider, ProviderError};
use futures_util::future::join_all;
use tracing::{info, warn};

use crate::batcher::ReservationBatcher;
use crate::booking::{BatchOutcome, BookingEngine, BookingOptions};
use crate::error::{EngineError, EngineResult};
use crate::registry::ProviderSet;
use crate::report::{OverallReport, ResultAggregator};
use crate::retry::retry;

/// Books a submission of slots and reports one result per slot.
///
/// Each region gets its own login and its batches run one after another on
/// that session; regions run concurrently.
pub struct BookingOrchestrator {
    providers: ProviderSet,
    directory: Arc<CourtDirectory>,
    engine: BookingEngine,
}

impl BookingOrchestrator {
    pub fn new(providers: ProviderSet, directory: Arc<CourtDirectory>, options: BookingOptions) -> Self {
        Self {
            providers,
            directory,
            engine: BookingEngine::new(options),
        }
    }

    /// Books `requests`.
    ///
    /// # Errors
    ///
    /// Fails before any network call if a court is unknown or a region with
    /// work has no provider. Provider failures never fail the call; they end
    /// up in the report.
    pub async fn book(
        &self,
        credentials: &CredentialSet,
        requests: &[TimeSlotRequest],
        abort: AbortHandle,
    ) -> EngineResult<OverallReport> {
        let batches = ReservationBatcher::new(&self.directory).group(requests)?;

        let mut by_region: BTreeMap<Region, Vec<ReservationBatch>> = BTreeMap::new();
        for batch in batches {
            by_region.entry(batch.region).or_default().push(batch);
        }

        let mut runs = Vec::with_capacity(by_region.len());
        for (region, batches) in by_region {
            let provider = self
                .providers
                .get(region)
                .ok_or_else(|| EngineError::missing_provider(region))?;
            runs.push(self.book_region(
                provider.as_ref(),
                credentials.for_region(region),
                batches,
                abort.clone(),
            ));
        }

        let outcomes = join_all(runs).await.into_iter().flatten();
        let report = ResultAggregator::merge(outcomes);
        info!(
            slots = requests.len(),
            booked = report.success_list.len(),
            failed = report.failed_list.len(),
            indeterminate = report.indeterminate_list.len(),
            "Booking finished"
        );
        Ok(report)
    }

    async fn book_region(
        &self,
        provider: &dyn CourtProvider,
        credential: Option<&Credential>,
        batches: Vec<ReservationBatch>,
        abort: AbortHandle,
    ) -> Vec<BatchOutcome> {
        let Some(credential) = credential else {
            warn!(region = %provider.region(), batches = batches.len(), "No credential for region");
            let error = ProviderError::authentication("no credential configured for this region")
                .with_provider(provider.name());
            return fail_all(batches, &error);
        };

        let policy = &self.engine.options().retry;
        let login = retry(policy, &abort, "login", || {
            provider.login(credential, abort.clone())
        })
        .await;

        let mut session = match login {
            Ok(session) => session,
            Err(error) if error.is_cancelled() => {
                return batches
                    .into_iter()
                    .map(|batch| BatchOutcome::Indeterminate {
                        batch,
                        reason: error.to_string(),
                    })
                    .collect();
            }
            Err(error) => {
                warn!(region = %provider.region(), error = %error, "Booking login failed");
                return fail_all(batches, &error);
            }
        };

        let mut outcomes = Vec::with_capacity(batches.len());
        for batch in &batches {
            outcomes.push(self.engine.run(provider, &mut session, batch).await);
        }
        outcomes
    }
}

fn fail_all(batches: Vec<ReservationBatch>, error: &ProviderError) -> Vec<BatchOutcome> {
    batches
        .into_iter()
        .map(|batch| BatchOutcome::Failed {
            batch,
            error: error.detached(),
        })
        .collect()
}
