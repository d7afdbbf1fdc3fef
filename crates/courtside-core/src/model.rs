//! Reservation domain model.
//!
//! These types are shared by the provider protocol code and the engine:
//!
//! - [`Region`] - which upstream booking site a court belongs to
//! - [`Credential`] - a member login for one region
//! - [`Reservation`] - one availability record scraped from a provider
//! - [`TimeSlotRequest`] - one slot the user asked to book
//! - [`ReservationBatch`] - slots submitted together in one provider transaction

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::{SlotTime, format_range};

/// The two municipal booking systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    /// Provider A, the Nowon district system.
    #[serde(rename = "A")]
    A,
    /// Provider B, the Dobong district system.
    #[serde(rename = "B")]
    B,
}

impl Region {
    pub const ALL: [Region; 2] = [Region::A, Region::B];

    /// Returns the report tag (`"A"` / `"B"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }

    /// Returns the provider name used in logs and error messages.
    pub fn provider_name(&self) -> &'static str {
        match self {
            Self::A => "nowon",
            Self::B => "dobong",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown region name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown region: {0:?} (expected A/nowon or B/dobong)")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "nowon" => Ok(Self::A),
            "b" | "dobong" => Ok(Self::B),
            _ => Err(UnknownRegion(s.to_string())),
        }
    }
}

/// A member login for one provider.
///
/// Credentials are handed in per operation and dropped with it. The password
/// is deliberately kept out of `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub region: Region,
    pub id: String,
    password: String,
}

impl Credential {
    pub fn new(region: Region, id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            region,
            id: id.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("region", &self.region)
            .field("id", &self.id)
            .field("password", &"***")
            .finish()
    }
}

/// Credentials for both regions, as returned by the credential store.
#[derive(Debug, Clone, Default)]
pub struct CredentialSet {
    pub nowon: Option<Credential>,
    pub dobong: Option<Credential>,
}

impl CredentialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a credential, replacing any previous one for the same region.
    pub fn with(mut self, credential: Credential) -> Self {
        match credential.region {
            Region::A => self.nowon = Some(credential),
            Region::B => self.dobong = Some(credential),
        }
        self
    }

    pub fn for_region(&self, region: Region) -> Option<&Credential> {
        match region {
            Region::A => self.nowon.as_ref(),
            Region::B => self.dobong.as_ref(),
        }
    }
}

/// Canonical availability state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Available,
    Unavailable,
    Reserved,
}

impl SlotStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

/// One availability record.
///
/// Field names follow the snapshot wire format (`court_num`, `start_time`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Facility display name.
    pub court: String,
    pub date: NaiveDate,
    /// User-facing court label, e.g. `"2번"`.
    pub court_num: String,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    pub status: SlotStatus,
}

/// One slot the user wants to book. Immutable input to the booking engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlotRequest {
    /// Court identifier from the court directory.
    pub court_id: String,
    pub date: NaiveDate,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    /// Raw upstream court code. May be left empty by callers and filled from
    /// the court directory.
    #[serde(default)]
    pub provider_court_code: String,
}

impl TimeSlotRequest {
    /// Returns the `HH:MM~HH:MM` label used in reports.
    pub fn time_label(&self) -> String {
        format_range(self.start_time, self.end_time)
    }
}

/// A request paired with its position in the caller's submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSlot {
    pub index: usize,
    pub request: TimeSlotRequest,
}

/// Slots for one (court, date) submitted in a single provider transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationBatch {
    pub region: Region,
    pub court_id: String,
    pub date: NaiveDate,
    /// Upstream facility code the court belongs to.
    pub facility_code: String,
    /// Facility display name.
    pub facility_name: String,
    /// User-facing court label.
    pub court_label: String,
    /// Slots in submission order.
    pub slots: Vec<BatchSlot>,
}

impl ReservationBatch {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over the requests in submission order.
    pub fn requests(&self) -> impl Iterator<Item = &TimeSlotRequest> {
        self.slots.iter().map(|s| &s.request)
    }
}
