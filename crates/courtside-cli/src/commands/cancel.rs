//! `courtside cancel`

use std::sync::Arc;

use courtside_core::Region;
use courtside_engine::CancellationEngine;
use courtside_providers::AbortHandle;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Cancels reservation `rent_no` in `region` and prints the receipt.
pub async fn run(
    config: &ClientConfig,
    region: Region,
    rent_no: &str,
    amount: u64,
    abort: AbortHandle,
) -> ClientResult<()> {
    let credential = config
        .credential(region)
        .map_err(ClientError::Config)?
        .ok_or_else(|| {
            ClientError::Config(format!(
                "no login configured for [{}]",
                region.provider_name()
            ))
        })?;

    let directory = Arc::new(config.directory());
    let providers = config.providers(&directory).map_err(ClientError::Config)?;

    let receipt = CancellationEngine::new(providers, config.retry_policy())
        .cancel(&credential, rent_no, amount, abort)
        .await?;
    super::print_json(&receipt)
}
