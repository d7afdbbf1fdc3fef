//! Response parsing for the Nowon site.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use courtside_core::{CourtDirectory, Reservation, SlotStatus, SlotTime};
use serde::Deserialize;
use serde_json::Value;

use crate::codes::decode_commit_code;
use crate::error::{ProviderError, ProviderResult};
use crate::markup::{alert_message, extract_token, hidden_input, parse_amount, shape_error};
use crate::provider::{BookingTokens, ConfirmedBooking, MemberInfo};

use super::PROVIDER;

/// One row of the batched availability payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotRow {
    place_cd: String,
    court_cd: String,
    #[serde(default)]
    court_nm: String,
    start_tm: String,
    end_tm: String,
    #[serde(default)]
    status: String,
}

/// Maps the site's status code onto [`SlotStatus`].
pub(super) fn slot_status(code: &str) -> SlotStatus {
    match code.trim() {
        "Y" => SlotStatus::Available,
        "R" => SlotStatus::Reserved,
        _ => SlotStatus::Unavailable,
    }
}

/// Accepts `HH:MM`, `HH:MM:SS` and the compact `HHMM` form.
fn parse_time(raw: &str) -> Option<SlotTime> {
    let raw = raw.trim();
    if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let hour = raw[..2].parse().ok()?;
        let minute = raw[2..].parse().ok()?;
        return SlotTime::new(hour, minute);
    }
    raw.parse().ok()
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw.trim(), "%Y%m%d"))
        .ok()
}

/// Parses the date-keyed availability payload.
///
/// A date mapped to `null` or an empty list has no rows; that is not an
/// error.
pub(super) fn parse_availability(
    body: &str,
    directory: &CourtDirectory,
) -> ProviderResult<Vec<Reservation>> {
    let by_date: BTreeMap<String, Option<Vec<SlotRow>>> = serde_json::from_str(body)
        .map_err(|e| shape_error(PROVIDER, format!("availability payload: {}", e)))?;

    let mut reservations = Vec::new();
    for (key, rows) in by_date {
        let date = parse_date(&key)
            .ok_or_else(|| shape_error(PROVIDER, format!("availability date key {:?}", key)))?;

        for row in rows.unwrap_or_default() {
            let (Some(start_time), Some(end_time)) = (parse_time(&row.start_tm), parse_time(&row.end_tm))
            else {
                return Err(shape_error(
                    PROVIDER,
                    format!("availability time {:?}~{:?}", row.start_tm, row.end_tm),
                ));
            };

            let court_num = match directory.court_by_code(&row.place_cd, &row.court_cd) {
                Some(court) => court.label.clone(),
                None if !row.court_nm.trim().is_empty() => {
                    directory.display_label(&row.place_cd, &row.court_nm)
                }
                None => row.court_cd.trim().to_string(),
            };

            reservations.push(Reservation {
                court: directory.facility_name(&row.place_cd),
                date,
                court_num,
                start_time,
                end_time,
                status: slot_status(&row.status),
            });
        }
    }

    Ok(reservations)
}

/// Scrapes the echo tokens, member fields and price from the confirm page.
pub(super) fn parse_confirm_page(html: &str) -> ProviderResult<ConfirmedBooking> {
    let token = |name: &str| {
        extract_token(html, name).ok_or_else(|| {
            let detail = match alert_message(html) {
                Some(alert) => format!("confirm page has no {} token (alert: {})", name, alert),
                None => format!("confirm page has no {} token", name),
            };
            shape_error(PROVIDER, detail)
        })
    };
    let vo_str = token("voStr")?;
    let time_str = token("timeStr")?;

    let field = |name: &str| hidden_input(html, name).filter(|v| !v.trim().is_empty());
    Ok(ConfirmedBooking {
        tokens: BookingTokens { vo_str, time_str },
        member: MemberInfo {
            name: field("userNm"),
            phone: field("userHp"),
        },
        price: field("totalPrice").and_then(|p| parse_amount(&p)),
    })
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    result: Value,
}

fn code_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decodes the finalize response into a reservation id.
pub(super) fn parse_commit(body: &str) -> ProviderResult<String> {
    let response: CommitResponse = serde_json::from_str(body)
        .map_err(|e| shape_error(PROVIDER, format!("commit response: {}", e)))?;
    let raw = code_text(&response.result)
        .ok_or_else(|| shape_error(PROVIDER, format!("commit result {}", response.result)))?;
    decode_commit_code(&raw)
        .into_result()
        .map_err(|e| e.with_provider(PROVIDER))
}

/// `{"result": "ok"|..., "msg": ...}` as returned by the cancel and alert
/// endpoints.
#[derive(Debug, Deserialize)]
struct StatusResponse {
    result: Value,
    #[serde(default)]
    msg: Option<String>,
}

impl StatusResponse {
    fn parse(body: &str, what: &str) -> ProviderResult<Self> {
        serde_json::from_str(body)
            .map_err(|e| shape_error(PROVIDER, format!("{} response: {}", what, e)))
    }

    /// The raw result code, or `None` when it is `"ok"`.
    fn refusal(&self) -> Option<String> {
        let raw = code_text(&self.result).unwrap_or_else(|| self.result.to_string());
        (!raw.trim().eq_ignore_ascii_case("ok")).then_some(raw)
    }

    fn message_or(self, fallback: &str) -> String {
        self.msg
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Interprets the cancellation response. Anything but `"ok"` is a refusal.
pub(super) fn parse_cancel(body: &str) -> ProviderResult<()> {
    let response = StatusResponse::parse(body, "cancel")?;
    match response.refusal() {
        None => Ok(()),
        Some(raw) => Err(ProviderError::cancellation_rejected(
            response.message_or("cancellation refused"),
        )
        .with_provider(PROVIDER)
        .with_raw_code(raw)),
    }
}

/// Interprets the reservation alert response.
///
/// The site answers with an `alert(...)` page when the session is gone and
/// with a non-`"ok"` result when the message could not be queued.
pub(super) fn parse_notify(body: &str) -> ProviderResult<()> {
    if let Some(alert) = alert_message(body) {
        return Err(ProviderError::invalid_response(alert).with_provider(PROVIDER));
    }
    let response = StatusResponse::parse(body, "alert")?;
    match response.refusal() {
        None => Ok(()),
        Some(raw) => Err(ProviderError::invalid_response(
            response.message_or("the site refused the request"),
        )
        .with_provider(PROVIDER)
        .with_raw_code(raw)),
    }
}
