//! Provider B: the Dobong district booking site.
//!
//! Availability is a rendered HTML time table, one page per facility and
//! date. Booking follows the same confirm/commit shape as Nowon with
//! different field names, and cancellation answers with a bare page.

mod parse;
mod provider;

pub use provider::DobongProvider;

pub(crate) const PROVIDER: &str = "dobong";
