//! CourtProvider trait, sessions and the two booking sites.
//!
//! This crate is the protocol layer between the engine and the municipal
//! booking sites:
//!
//! - [`CourtProvider`] - The trait both sites implement
//! - [`SessionManager`] / [`SessionState`] - Login and per-session cookies
//! - [`HttpTransport`] - The single-round-trip HTTP seam
//! - [`decode_commit_code`] - The one place finalize result codes are read
//! - [`ProviderError`] - Error taxonomy shared with the engine
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │   Nowon site    │    │   Dobong site   │
//! └────────┬────────┘    └────────┬────────┘
//!          │     HttpTransport    │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │  NowonProvider  │    │ DobongProvider  │
//! └────────┬────────┘    └────────┬────────┘
//!          │    CourtProvider     │
//!          └──────────┬───────────┘
//!                     ▼
//!          Reservation / ConfirmedBooking
//! ```

pub mod abort;
pub mod codes;
pub mod config;
pub mod cookies;
#[cfg(feature = "dobong")]
pub mod dobong;
pub mod error;
pub mod markup;
#[cfg(feature = "nowon")]
pub mod nowon;
pub mod provider;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod transport;

pub use abort::AbortHandle;
pub use codes::{CommitCode, decode_commit_code};
pub use config::ProviderConfig;
pub use cookies::CookieJar;
#[cfg(feature = "dobong")]
pub use dobong::DobongProvider;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
#[cfg(feature = "nowon")]
pub use nowon::NowonProvider;
pub use provider::{
    BookingTokens, BoxFuture, ConfirmedBooking, CourtProvider, FetchMode, MemberInfo, Token,
};
pub use session::{LoginFlow, SessionManager, SessionState};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};
