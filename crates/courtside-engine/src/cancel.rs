//! Cancellation of a previous booking.

use courtside_core::{Credential, Region};
use courtside_providers::{AbortHandle, ProviderError, ProviderResult};
use serde::Serialize;
use tracing::info;

use crate::registry::ProviderSet;
use crate::retry::{RetryPolicy, retry};

/// A cancellation the provider accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelReceipt {
    pub region: Region,
    #[serde(rename = "rent_no")]
    pub rent_no: String,
    pub amount_paid: u64,
}

/// Runs the cancel flow: a fresh login, then one cancel request.
pub struct CancellationEngine {
    providers: ProviderSet,
    retry: RetryPolicy,
}

impl CancellationEngine {
    pub fn new(providers: ProviderSet, retry: RetryPolicy) -> Self {
        Self { providers, retry }
    }

    /// Cancels reservation `rent_no` in the credential's region.
    ///
    /// Login is retried on transport failures; the cancel request is not.
    ///
    /// # Errors
    ///
    /// `CancellationRejected` if the site refuses, for example because the
    /// booking is already cancelled.
    pub async fn cancel(
        &self,
        credential: &Credential,
        rent_no: &str,
        amount_paid: u64,
        abort: AbortHandle,
    ) -> ProviderResult<CancelReceipt> {
        let region = credential.region;
        let provider = self.providers.get(region).ok_or_else(|| {
            ProviderError::configuration(format!("no provider configured for region {}", region))
        })?;

        let mut session = retry(&self.retry, &abort, "login", || {
            provider.login(credential, abort.clone())
        })
        .await?;

        abort.check("cancel")?;
        provider.cancel(&mut session, rent_no, amount_paid).await?;

        info!(region = %region, rent_no, amount_paid, "Reservation cancelled");
        Ok(CancelReceipt {
            region,
            rent_no: rent_no.to_string(),
            amount_paid,
        })
    }
}
