//! Reservation engine: availability cache and crawler, batching, the booking
//! state machine, cancellation and result reporting.

pub mod batcher;
pub mod blob;
pub mod book;
pub mod booking;
pub mod cache;
pub mod cancel;
pub mod crawl;
pub mod error;
pub mod fetcher;
pub mod registry;
pub mod report;
pub mod retry;

pub use batcher::ReservationBatcher;
pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use book::BookingOrchestrator;
pub use booking::{
    BatchOutcome, BookingEngine, BookingEvent, BookingOptions, BookingState, InvalidTransition,
    transition,
};
pub use cache::{AvailabilityCache, CacheSnapshot, STALE_AFTER_MS, cache_key};
pub use cancel::{CancelReceipt, CancellationEngine};
pub use crawl::{MonthReport, MonthlyCrawler, dates_in_month};
pub use error::{EngineError, EngineResult};
pub use fetcher::{Availability, AvailabilityFetcher, CrawlConfig, DateGap};
pub use registry::ProviderSet;
pub use report::{OverallReport, Outcome, ReservationResult, ResultAggregator};
pub use retry::{RetryPolicy, retry};
