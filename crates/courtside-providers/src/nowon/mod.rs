//! Provider A: the Nowon district booking site.
//!
//! Availability comes from one batched JSON endpoint that takes any number of
//! dates. Booking is a server-rendered confirm page followed by a JSON commit.
//!
//! # Example
//!
//! ```ignore
//! use courtside_providers::nowon::NowonProvider;
//!
//! let config = ProviderConfig::new("https://reserve.nowon.example/")?;
//! let provider = NowonProvider::new(config, Arc::new(CourtDirectory::builtin()))?;
//! let session = provider.login(&credential, AbortHandle::new()).await?;
//! ```

mod parse;
mod provider;

pub use provider::NowonProvider;

pub(crate) const PROVIDER: &str = "nowon";
