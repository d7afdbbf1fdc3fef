//! Per-slot results and the overall booking report.

use chrono::NaiveDate;
use courtside_core::{BatchSlot, Region, ReservationBatch};
use courtside_providers::ProviderErrorCode;
use serde::Serialize;

use crate::booking::BatchOutcome;

/// How a slot ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failed,
    /// Aborted mid-batch, or committed with an unknown result.
    Indeterminate,
}

/// The result for one submitted slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResult {
    /// Position of the slot in the submission.
    pub slot_index: usize,
    /// Facility display name.
    pub court: String,
    pub court_num: String,
    pub date: NaiveDate,
    /// `HH:MM~HH:MM`.
    pub time: String,
    pub success: bool,
    pub message: String,
    #[serde(rename = "rent_no", skip_serializing_if = "Option::is_none")]
    pub rent_no: Option<String>,
    /// Batch total in won as a decimal string, e.g. `"8000"`; set on the
    /// first slot of a booked batch only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub region: Region,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProviderErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl ReservationResult {
    fn for_slot(batch: &ReservationBatch, slot: &BatchSlot, outcome: Outcome, message: String) -> Self {
        Self {
            slot_index: slot.index,
            court: batch.facility_name.clone(),
            court_num: batch.court_label.clone(),
            date: slot.request.date,
            time: slot.request.time_label(),
            success: outcome == Outcome::Success,
            message,
            rent_no: None,
            price: None,
            region: batch.region,
            outcome,
            failure: None,
            raw_code: None,
            warning: None,
        }
    }
}

/// Every slot's result, split by outcome.
///
/// Each list is in submission order; [`entries`](Self::entries) interleaves
/// them back into the original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallReport {
    pub success_list: Vec<ReservationResult>,
    pub failed_list: Vec<ReservationResult>,
    pub indeterminate_list: Vec<ReservationResult>,
}

impl OverallReport {
    /// All results in submission order.
    pub fn entries(&self) -> Vec<&ReservationResult> {
        let mut all: Vec<&ReservationResult> = self
            .success_list
            .iter()
            .chain(&self.failed_list)
            .chain(&self.indeterminate_list)
            .collect();
        all.sort_by_key(|r| r.slot_index);
        all
    }

    pub fn len(&self) -> usize {
        self.success_list.len() + self.failed_list.len() + self.indeterminate_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if every slot was booked.
    pub fn all_succeeded(&self) -> bool {
        self.failed_list.is_empty() && self.indeterminate_list.is_empty()
    }
}

/// Turns batch outcomes into an [`OverallReport`].
#[derive(Debug, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    /// Expands every outcome to one result per slot, in submission order.
    pub fn merge(outcomes: impl IntoIterator<Item = BatchOutcome>) -> OverallReport {
        let mut results: Vec<ReservationResult> = Vec::new();
        for outcome in outcomes {
            results.extend(Self::expand(outcome));
        }
        results.sort_by_key(|r| r.slot_index);

        let mut report = OverallReport::default();
        for result in results {
            match result.outcome {
                Outcome::Success => report.success_list.push(result),
                Outcome::Failed => report.failed_list.push(result),
                Outcome::Indeterminate => report.indeterminate_list.push(result),
            }
        }
        report
    }

    fn expand(outcome: BatchOutcome) -> Vec<ReservationResult> {
        match outcome {
            BatchOutcome::Booked {
                batch,
                reservation_id,
                price,
                warning,
            } => batch
                .slots
                .iter()
                .enumerate()
                .map(|(pos, slot)| {
                    let mut result = ReservationResult::for_slot(
                        &batch,
                        slot,
                        Outcome::Success,
                        "Reservation completed.".to_string(),
                    );
                    result.rent_no = Some(reservation_id.clone());
                    result.price = price.filter(|_| pos == 0).map(|p| p.to_string());
                    result.warning = warning.clone();
                    result
                })
                .collect(),
            BatchOutcome::Failed { batch, error } => batch
                .slots
                .iter()
                .map(|slot| {
                    let mut result = ReservationResult::for_slot(
                        &batch,
                        slot,
                        Outcome::Failed,
                        error.user_message().to_string(),
                    );
                    result.failure = Some(error.code());
                    result.raw_code = error.raw_code().map(str::to_string);
                    result
                })
                .collect(),
            BatchOutcome::Indeterminate { batch, reason } => batch
                .slots
                .iter()
                .map(|slot| {
                    let mut result = ReservationResult::for_slot(
                        &batch,
                        slot,
                        Outcome::Indeterminate,
                        "The booking was interrupted; check your reservations on the site."
                            .to_string(),
                    );
                    result.warning = Some(reason.clone());
                    result
                })
                .collect(),
        }
    }
}
