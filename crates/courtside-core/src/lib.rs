//! Core types: regions, credentials, slots, availability records, court directory

pub mod courts;
pub mod model;
pub mod time;
pub mod tracing;

pub use courts::{Court, CourtDirectory, Facility};
pub use model::{
    BatchSlot, Credential, CredentialSet, Region, Reservation, ReservationBatch, SlotStatus,
    TimeSlotRequest, UnknownRegion,
};
pub use time::{SlotTime, SlotTimeError, format_range, parse_range};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
