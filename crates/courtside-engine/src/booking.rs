//! The per-batch booking state machine.
//!
//! ```text
//! INIT ──confirm──▶ CONFIRMED ──finalize──▶ FINALIZED ──notify──▶ NOTIFIED
//!   │                  │
//!   ├──────────────────┴──▶ FAILED          (classified provider error)
//!   └──────────────────────▶ INDETERMINATE  (aborted, or commit outcome unknown)
//! ```
//!
//! Once a batch is FINALIZED the booking exists upstream, so nothing after
//! that point can fail it: a notify failure becomes a warning on the result.

use std::fmt;

use courtside_core::ReservationBatch;
use courtside_providers::{
    ConfirmedBooking, CourtProvider, ProviderError, ProviderResult, SessionState,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::retry::RetryPolicy;

/// Where a batch is in the booking flow.
#[derive(Debug)]
pub enum BookingState {
    Init,
    Confirmed(ConfirmedBooking),
    Finalized {
        confirmed: ConfirmedBooking,
        reservation_id: String,
    },
    Notified {
        reservation_id: String,
        price: Option<u64>,
        warning: Option<String>,
    },
    Failed(ProviderError),
    Indeterminate(String),
}

impl BookingState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::Confirmed(_) => "CONFIRMED",
            Self::Finalized { .. } => "FINALIZED",
            Self::Notified { .. } => "NOTIFIED",
            Self::Failed(_) => "FAILED",
            Self::Indeterminate(_) => "INDETERMINATE",
        }
    }

    /// Returns true for NOTIFIED, FAILED and INDETERMINATE.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Notified { .. } | Self::Failed(_) | Self::Indeterminate(_)
        )
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What happened during a step.
#[derive(Debug)]
pub enum BookingEvent {
    ConfirmSucceeded(ConfirmedBooking),
    FinalizeSucceeded(String),
    /// Notify ran or was skipped; `warning` is set if it failed.
    NotifyCompleted { warning: Option<String> },
    StepFailed(ProviderError),
    /// Aborted, or the commit was sent but its outcome is unknown.
    Interrupted(String),
}

impl BookingEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConfirmSucceeded(_) => "confirm_succeeded",
            Self::FinalizeSucceeded(_) => "finalize_succeeded",
            Self::NotifyCompleted { .. } => "notify_completed",
            Self::StepFailed(_) => "step_failed",
            Self::Interrupted(_) => "interrupted",
        }
    }
}

/// An event that is not allowed in the current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid booking transition: {event} in state {state}")]
pub struct InvalidTransition {
    pub state: &'static str,
    pub event: &'static str,
}

/// Applies `event` to `state`.
pub fn transition(
    state: BookingState,
    event: BookingEvent,
) -> Result<BookingState, InvalidTransition> {
    use BookingEvent as E;
    use BookingState as S;

    match (state, event) {
        (S::Init, E::ConfirmSucceeded(confirmed)) => Ok(S::Confirmed(confirmed)),
        (S::Confirmed(confirmed), E::FinalizeSucceeded(reservation_id)) => Ok(S::Finalized {
            confirmed,
            reservation_id,
        }),
        (
            S::Finalized {
                confirmed,
                reservation_id,
            },
            E::NotifyCompleted { warning },
        ) => Ok(S::Notified {
            reservation_id,
            price: confirmed.price,
            warning,
        }),
        (S::Init | S::Confirmed(_), E::StepFailed(error)) => Ok(S::Failed(error)),
        (S::Init | S::Confirmed(_), E::Interrupted(reason)) => Ok(S::Indeterminate(reason)),
        (state, event) => Err(InvalidTransition {
            state: state.name(),
            event: event.name(),
        }),
    }
}

/// Booking settings.
#[derive(Debug, Clone)]
pub struct BookingOptions {
    /// Whether to ask the site to send its reservation alert.
    pub send_alerts: bool,
    /// Retry policy for confirm. Finalize is never retried.
    pub retry: RetryPolicy,
}

impl Default for BookingOptions {
    fn default() -> Self {
        Self {
            send_alerts: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl BookingOptions {
    pub fn with_alerts(mut self, send_alerts: bool) -> Self {
        self.send_alerts = send_alerts;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Terminal result of one batch.
#[derive(Debug)]
pub enum BatchOutcome {
    Booked {
        batch: ReservationBatch,
        reservation_id: String,
        price: Option<u64>,
        warning: Option<String>,
    },
    Failed {
        batch: ReservationBatch,
        error: ProviderError,
    },
    Indeterminate {
        batch: ReservationBatch,
        reason: String,
    },
}

impl BatchOutcome {
    pub fn batch(&self) -> &ReservationBatch {
        match self {
            Self::Booked { batch, .. } | Self::Failed { batch, .. } | Self::Indeterminate { batch, .. } => {
                batch
            }
        }
    }

    pub fn is_booked(&self) -> bool {
        matches!(self, Self::Booked { .. })
    }
}

/// Drives one batch through confirm, finalize and notify.
#[derive(Debug, Clone, Default)]
pub struct BookingEngine {
    options: BookingOptions,
}

impl BookingEngine {
    pub fn new(options: BookingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &BookingOptions {
        &self.options
    }

    /// Runs the state machine for `batch` on `session` to a terminal state.
    pub async fn run(
        &self,
        provider: &dyn CourtProvider,
        session: &mut SessionState,
        batch: &ReservationBatch,
    ) -> BatchOutcome {
        let mut state = BookingState::Init;

        while !state.is_terminal() {
            let event = match &state {
                BookingState::Init => match self.confirm(provider, session, batch).await {
                    Ok(confirmed) => BookingEvent::ConfirmSucceeded(confirmed),
                    Err(e) if e.is_cancelled() => BookingEvent::Interrupted(e.to_string()),
                    Err(e) => BookingEvent::StepFailed(e),
                },
                BookingState::Confirmed(confirmed) => {
                    self.finalize(provider, session, confirmed).await
                }
                BookingState::Finalized {
                    confirmed,
                    reservation_id,
                } => {
                    let warning = self
                        .notify(provider, session, batch, confirmed, reservation_id)
                        .await;
                    BookingEvent::NotifyCompleted { warning }
                }
                BookingState::Notified { .. }
                | BookingState::Failed(_)
                | BookingState::Indeterminate(_) => break,
            };

            debug!(court = %batch.court_id, date = %batch.date, state = %state, event = event.name(), "Booking step");
            state = match transition(state, event) {
                Ok(next) => next,
                Err(e) => {
                    error!(court = %batch.court_id, date = %batch.date, error = %e, "Booking state machine violated");
                    BookingState::Failed(ProviderError::internal(e.to_string()))
                }
            };
        }

        self.outcome(state, batch)
    }

    async fn confirm(
        &self,
        provider: &dyn CourtProvider,
        session: &mut SessionState,
        batch: &ReservationBatch,
    ) -> ProviderResult<ConfirmedBooking> {
        let mut attempt = 1;
        loop {
            session.abort_handle().check("confirm")?;
            match provider.confirm(session, batch).await {
                Ok(confirmed) => return Ok(confirmed),
                Err(error) => match self.options.retry.next_delay(&error, attempt) {
                    Some(delay) => {
                        warn!(court = %batch.court_id, attempt, error = %error, "Retrying confirm");
                        session.abort_handle().sleep(delay).await?;
                        attempt += 1;
                    }
                    None => return Err(error),
                },
            }
        }
    }

    async fn finalize(
        &self,
        provider: &dyn CourtProvider,
        session: &mut SessionState,
        confirmed: &ConfirmedBooking,
    ) -> BookingEvent {
        if let Err(e) = session.abort_handle().check("finalize") {
            return BookingEvent::Interrupted(e.to_string());
        }
        match provider.finalize(session, &confirmed.tokens).await {
            Ok(reservation_id) => BookingEvent::FinalizeSucceeded(reservation_id),
            // The commit may have landed upstream; it must not be retried or
            // reported as a plain failure.
            Err(e) if e.is_cancelled() || e.is_retryable() => {
                BookingEvent::Interrupted(format!("commit outcome unknown: {}", e))
            }
            Err(e) => BookingEvent::StepFailed(e),
        }
    }

    async fn notify(
        &self,
        provider: &dyn CourtProvider,
        session: &mut SessionState,
        batch: &ReservationBatch,
        confirmed: &ConfirmedBooking,
        reservation_id: &str,
    ) -> Option<String> {
        if !self.options.send_alerts {
            debug!(reservation_id, "Reservation alerts disabled; skipping notify");
            return None;
        }
        match provider
            .notify(session, &confirmed.tokens, batch, &confirmed.member, reservation_id)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(reservation_id, error = %e, "Reservation alert failed");
                Some(format!("Booked, but the reservation alert was not sent: {}", e.message()))
            }
        }
    }

    fn outcome(&self, state: BookingState, batch: &ReservationBatch) -> BatchOutcome {
        let batch = batch.clone();
        match state {
            BookingState::Notified {
                reservation_id,
                price,
                warning,
            } => {
                info!(court = %batch.court_id, date = %batch.date, slots = batch.len(), reservation_id = %reservation_id, "Batch booked");
                BatchOutcome::Booked {
                    batch,
                    reservation_id,
                    price,
                    warning,
                }
            }
            BookingState::Failed(error) => {
                warn!(court = %batch.court_id, date = %batch.date, error = %error, "Batch failed");
                BatchOutcome::Failed { batch, error }
            }
            BookingState::Indeterminate(reason) => {
                warn!(court = %batch.court_id, date = %batch.date, reason = %reason, "Batch outcome indeterminate");
                BatchOutcome::Indeterminate { batch, reason }
            }
            other => BatchOutcome::Failed {
                error: ProviderError::internal(format!("booking stopped in state {}", other)),
                batch,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_providers::{BookingTokens, MemberInfo, ProviderErrorCode};

    fn confirmed() -> ConfirmedBooking {
        ConfirmedBooking {
            tokens: BookingTokens::new("abc", "13:00~14:00~19~2코트"),
            member: MemberInfo::default(),
            price: Some(8000),
        }
    }

    #[test]
    fn happy_path() {
        let state = transition(BookingState::Init, BookingEvent::ConfirmSucceeded(confirmed())).unwrap();
        assert_eq!(state.name(), "CONFIRMED");
        let state = transition(state, BookingEvent::FinalizeSucceeded("42".into())).unwrap();
        assert_eq!(state.name(), "FINALIZED");
        let state = transition(state, BookingEvent::NotifyCompleted { warning: None }).unwrap();
        match state {
            BookingState::Notified {
                reservation_id,
                price,
                warning,
            } => {
                assert_eq!(reservation_id, "42");
                assert_eq!(price, Some(8000));
                assert!(warning.is_none());
            }
            other => panic!("unexpected state {}", other),
        }
    }

    #[test]
    fn failures_before_commit() {
        let state = transition(
            BookingState::Init,
            BookingEvent::StepFailed(ProviderError::markup_shape("no token")),
        )
        .unwrap();
        assert!(matches!(state, BookingState::Failed(ref e) if e.code() == ProviderErrorCode::MarkupShape));

        let state = transition(
            BookingState::Confirmed(confirmed()),
            BookingEvent::Interrupted("aborted".into()),
        )
        .unwrap();
        assert!(matches!(state, BookingState::Indeterminate(_)));
    }

    #[test]
    fn committed_booking_cannot_fail() {
        let finalized = BookingState::Finalized {
            confirmed: confirmed(),
            reservation_id: "42".into(),
        };
        let err = transition(
            finalized,
            BookingEvent::StepFailed(ProviderError::network("reset")),
        )
        .unwrap_err();
        assert_eq!(err.state, "FINALIZED");
        assert_eq!(err.event, "step_failed");
    }

    #[test]
    fn steps_cannot_be_skipped_or_replayed() {
        assert!(transition(BookingState::Init, BookingEvent::FinalizeSucceeded("1".into())).is_err());
        assert!(
            transition(
                BookingState::Failed(ProviderError::network("x")),
                BookingEvent::ConfirmSucceeded(confirmed())
            )
            .is_err()
        );
        assert!(
            transition(
                BookingState::Indeterminate("x".into()),
                BookingEvent::NotifyCompleted { warning: None }
            )
            .is_err()
        );
    }
}
