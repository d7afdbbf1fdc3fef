//! Grouping of requested slots into provider transactions.
//!
//! A batch holds the slots for exactly one (court, date); since a court
//! belongs to exactly one facility and a facility to one region, batches can
//! never span providers.

use std::collections::HashMap;

use chrono::NaiveDate;
use courtside_core::{BatchSlot, CourtDirectory, ReservationBatch, TimeSlotRequest};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Groups requests by (court, date) using the court directory for routing.
#[derive(Debug, Clone, Copy)]
pub struct ReservationBatcher<'a> {
    directory: &'a CourtDirectory,
}

impl<'a> ReservationBatcher<'a> {
    pub fn new(directory: &'a CourtDirectory) -> Self {
        Self { directory }
    }

    /// Partitions `requests` into batches.
    ///
    /// Batches are ordered by first appearance and slots within a batch keep
    /// submission order. Every slot remembers its submission index. A blank
    /// upstream court code is filled in from the directory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownCourt`] if any request names a court the
    /// directory cannot route. Nothing is grouped in that case.
    pub fn group(&self, requests: &[TimeSlotRequest]) -> EngineResult<Vec<ReservationBatch>> {
        let mut batches: Vec<ReservationBatch> = Vec::new();
        let mut index_of: HashMap<(&str, NaiveDate), usize> = HashMap::new();

        for (index, request) in requests.iter().enumerate() {
            let (court, facility) = self
                .directory
                .court(&request.court_id)
                .zip(self.directory.facility_of(&request.court_id))
                .ok_or_else(|| EngineError::unknown_court(&request.court_id))?;

            let mut request = request.clone();
            if request.provider_court_code.trim().is_empty() {
                request.provider_court_code = court.provider_code.clone();
            }
            let slot = BatchSlot { index, request };
            let key = (court.court_id.as_str(), slot.request.date);
            match index_of.get(&key) {
                Some(&pos) => batches[pos].slots.push(slot),
                None => {
                    index_of.insert(key, batches.len());
                    batches.push(ReservationBatch {
                        region: facility.region,
                        court_id: court.court_id.clone(),
                        date: slot.request.date,
                        facility_code: facility.code.clone(),
                        facility_name: facility.name.clone(),
                        court_label: court.label.clone(),
                        slots: vec![slot],
                    });
                }
            }
        }

        debug!(requests = requests.len(), batches = batches.len(), "Grouped reservation batches");
        Ok(batches)
    }
}
