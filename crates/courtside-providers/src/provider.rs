//! CourtProvider trait definition.
//!
//! This module defines the [`CourtProvider`] trait, the abstraction over the
//! two municipal booking sites. A provider knows how to:
//! - Log in and produce a [`SessionState`]
//! - Scrape availability for a set of dates
//! - Run the three booking steps (confirm, finalize, notify)
//! - Cancel a previous booking
//!
//! Providers hold no per-user state. Everything tied to one login lives in the
//! [`SessionState`] passed to each call, and steps that mutate the upstream
//! session take it by `&mut` so calls sharing one session are serialized.

use std::borrow::Cow;
use std::future::Future;
use std::pin::Pin;

use chrono::NaiveDate;
use courtside_core::{Credential, Region, Reservation, ReservationBatch};

use crate::abort::AbortHandle;
use crate::error::ProviderResult;
use crate::session::SessionState;

/// A boxed future for async trait methods.
///
/// Using boxed futures keeps the trait object-safe so providers can be held
/// as `Arc<dyn CourtProvider>`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a provider serves availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// One request covers any number of dates.
    Batched,
    /// One request per date.
    PerDate,
}

/// Contact fields pre-filled on the confirm page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberInfo {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// One echo token as scraped from the confirm page.
///
/// The site expects the token back exactly as a browser would have posted
/// it, so the variant records where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Entity-decoded `value` of a hidden input. Browsers percent-encode it
    /// when the form is submitted.
    Field(String),
    /// Bytes lifted from a query string in a script or link. They are
    /// already in wire form.
    Encoded(String),
}

impl Token {
    /// The scraped value, without any wire encoding applied.
    pub fn as_str(&self) -> &str {
        match self {
            Token::Field(v) | Token::Encoded(v) => v,
        }
    }

    /// The token as it appears in an `application/x-www-form-urlencoded` body.
    pub fn form_value(&self) -> Cow<'_, str> {
        match self {
            Token::Field(v) => urlencoding::encode(v),
            Token::Encoded(v) => Cow::Borrowed(v),
        }
    }
}

/// The two opaque tokens the confirm page hands back.
///
/// They must reach finalize byte-for-byte as the page would have sent them;
/// see [`form_body`](Self::form_body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingTokens {
    pub vo_str: Token,
    pub time_str: Token,
}

impl BookingTokens {
    /// Tokens already in wire form.
    pub fn new(vo_str: impl Into<String>, time_str: impl Into<String>) -> Self {
        Self {
            vo_str: Token::Encoded(vo_str.into()),
            time_str: Token::Encoded(time_str.into()),
        }
    }

    /// The `voStr=..&timeStr=..` body the commit request carries.
    pub fn form_body(&self) -> String {
        format!(
            "voStr={}&timeStr={}",
            self.vo_str.form_value(),
            self.time_str.form_value()
        )
    }
}

/// Everything scraped from a successful confirm step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedBooking {
    pub tokens: BookingTokens,
    pub member: MemberInfo,
    /// Total price for the batch in won, if the page shows one.
    pub price: Option<u64>,
}

/// The core abstraction over a booking site.
///
/// # Implementation Notes
///
/// - Every HTTP call must go through the session helpers so cookies are sent
///   and merged and the session's [`AbortHandle`] is honored.
/// - `finalize` commits upstream. Implementations must not retry it.
/// - Result codes are decoded once, at this boundary, via
///   [`decode_commit_code`](crate::codes::decode_commit_code).
pub trait CourtProvider: Send + Sync {
    /// The region this provider serves.
    fn region(&self) -> Region;

    /// Short provider name used in logs and errors ("nowon", "dobong").
    fn name(&self) -> &str {
        self.region().provider_name()
    }

    /// How [`fetch_dates`](Self::fetch_dates) should be driven.
    fn fetch_mode(&self) -> FetchMode;

    /// Logs in and returns a session bound to `credential`.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when the site rejects the credential,
    /// `NetworkError` on transport failures at any hop.
    fn login<'a>(
        &'a self,
        credential: &'a Credential,
        abort: AbortHandle,
    ) -> BoxFuture<'a, ProviderResult<SessionState>>;

    /// Returns availability records for `dates`.
    ///
    /// For [`FetchMode::PerDate`] providers callers pass one date per call so
    /// a failing date can be recorded as a gap. Zero rows is an empty list.
    fn fetch_dates<'a>(
        &'a self,
        session: &'a SessionState,
        dates: &'a [NaiveDate],
    ) -> BoxFuture<'a, ProviderResult<Vec<Reservation>>>;

    /// Submits the batch's slots and scrapes the echo tokens.
    fn confirm<'a>(
        &'a self,
        session: &'a mut SessionState,
        batch: &'a ReservationBatch,
    ) -> BoxFuture<'a, ProviderResult<ConfirmedBooking>>;

    /// Commits the booking and returns the upstream reservation id.
    fn finalize<'a>(
        &'a self,
        session: &'a mut SessionState,
        tokens: &'a BookingTokens,
    ) -> BoxFuture<'a, ProviderResult<String>>;

    /// Asks the site to send its reservation alert.
    fn notify<'a>(
        &'a self,
        session: &'a mut SessionState,
        tokens: &'a BookingTokens,
        batch: &'a ReservationBatch,
        member: &'a MemberInfo,
        reservation_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>>;

    /// Cancels a previous booking.
    ///
    /// # Errors
    ///
    /// `CancellationRejected` when the site refuses, e.g. the booking is
    /// already cancelled.
    fn cancel<'a>(
        &'a self,
        session: &'a mut SessionState,
        rent_no: &'a str,
        amount_paid: u64,
    ) -> BoxFuture<'a, ProviderResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_tokens_are_kept_verbatim() {
        let tokens = BookingTokens::new("abc%2B", "13:00~14:00~19~2코트");
        assert_eq!(tokens.form_body(), "voStr=abc%2B&timeStr=13:00~14:00~19~2코트");
    }

    #[test]
    fn field_tokens_are_encoded_like_a_browser_would() {
        let tokens = BookingTokens {
            vo_str: Token::Field("id=7&seq=2".into()),
            time_str: Token::Field("13:00~14:00+19".into()),
        };
        assert_eq!(tokens.vo_str.as_str(), "id=7&seq=2");
        assert_eq!(
            tokens.form_body(),
            "voStr=id%3D7%26seq%3D2&timeStr=13%3A00~14%3A00%2B19"
        );
    }

    #[test]
    fn member_info_defaults_empty() {
        let member = MemberInfo::default();
        assert!(member.name.is_none());
        assert!(member.phone.is_none());
    }
}
