//! Monthly availability snapshots with staleness detection.
//!
//! A snapshot covers one (year, month) across both regions and is stored as
//! a single JSON blob. Snapshots older than [`STALE_AFTER_MS`] are treated
//! as misses by [`AvailabilityCache::get_fresh`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use courtside_core::Reservation;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::blob::BlobStore;
use crate::error::{EngineError, EngineResult};

/// Age after which a snapshot is stale: one hour.
pub const STALE_AFTER_MS: i64 = 60 * 60 * 1000;

/// Returns the blob key for a month, e.g. `"2025-05-all.json"`.
pub fn cache_key(year: i32, month: u32) -> String {
    format!("{}-{:02}-all.json", year, month)
}

/// Current time in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// One month of availability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// When the snapshot was taken, in epoch milliseconds.
    pub updated_at: i64,
    pub year: i32,
    /// 1-based month.
    pub month: u32,
    /// Availability per date, keyed `YYYY-MM-DD`.
    pub data: BTreeMap<NaiveDate, Vec<Reservation>>,
}

impl CacheSnapshot {
    /// Creates an empty snapshot stamped at `updated_at`.
    pub fn new(year: i32, month: u32, updated_at: i64) -> Self {
        Self {
            updated_at,
            year,
            month,
            data: BTreeMap::new(),
        }
    }

    /// Groups `reservations` by date into a snapshot.
    pub fn from_reservations(
        year: i32,
        month: u32,
        updated_at: i64,
        reservations: impl IntoIterator<Item = Reservation>,
    ) -> Self {
        let mut snapshot = Self::new(year, month, updated_at);
        for reservation in reservations {
            snapshot
                .data
                .entry(reservation.date)
                .or_default()
                .push(reservation);
        }
        snapshot
    }

    /// Returns true if the snapshot is more than one hour old at `now_ms`.
    pub fn is_stale_at(&self, now_ms: i64) -> bool {
        now_ms - self.updated_at > STALE_AFTER_MS
    }

    /// Returns true if the snapshot is stale now.
    pub fn is_stale(&self) -> bool {
        self.is_stale_at(now_ms())
    }

    /// Total number of availability records.
    pub fn len(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records for one date.
    pub fn for_date(&self, date: NaiveDate) -> &[Reservation] {
        self.data.get(&date).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Snapshot cache over a [`BlobStore`].
///
/// Last writer wins; no locking beyond what the store provides.
#[derive(Clone)]
pub struct AvailabilityCache {
    store: Arc<dyn BlobStore>,
}

impl AvailabilityCache {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Returns the stored snapshot for a month, stale or not.
    ///
    /// A blob that cannot be decoded counts as a miss.
    pub async fn get(&self, year: i32, month: u32) -> EngineResult<Option<CacheSnapshot>> {
        let key = cache_key(year, month);
        let Some(bytes) = self.store.get(&key).await? else {
            debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        match serde_json::from_slice::<CacheSnapshot>(&bytes) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable snapshot");
                Ok(None)
            }
        }
    }

    /// Returns the snapshot only if present and not stale at `now_ms`.
    pub async fn get_fresh(
        &self,
        year: i32,
        month: u32,
        now_ms: i64,
    ) -> EngineResult<Option<CacheSnapshot>> {
        match self.get(year, month).await? {
            Some(snapshot) if !snapshot.is_stale_at(now_ms) => {
                debug!(year, month, age_ms = now_ms - snapshot.updated_at, "Cache hit");
                Ok(Some(snapshot))
            }
            Some(snapshot) => {
                debug!(year, month, age_ms = now_ms - snapshot.updated_at, "Cached snapshot is stale");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Stores `snapshot`, fully replacing the month's previous blob.
    pub async fn put(&self, year: i32, month: u32, snapshot: &CacheSnapshot) -> EngineResult<()> {
        if snapshot.year != year || snapshot.month != month {
            return Err(EngineError::SnapshotMismatch {
                expected: format!("{}-{:02}", year, month),
                found: format!("{}-{:02}", snapshot.year, snapshot.month),
            });
        }
        let bytes = serde_json::to_vec(snapshot)?;
        let key = cache_key(year, month);
        self.store.put(&key, bytes).await?;
        debug!(key = %key, records = snapshot.len(), "Stored snapshot");
        Ok(())
    }

    /// Returns true if `snapshot` is stale now.
    pub fn is_stale(&self, snapshot: &CacheSnapshot) -> bool {
        snapshot.is_stale()
    }

    /// Removes the month's snapshot.
    pub async fn invalidate(&self, year: i32, month: u32) -> EngineResult<()> {
        self.store.delete(&cache_key(year, month)).await
    }
}
