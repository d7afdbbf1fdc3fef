//! Response parsing for the Dobong site.

use chrono::NaiveDate;
use courtside_core::{CourtDirectory, Reservation, SlotStatus, parse_range};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::codes::decode_commit_code;
use crate::error::{ProviderError, ProviderResult};
use crate::markup::{
    alert_message, extract_token, hidden_input, parse_amount, shape_error, table_rows,
};
use crate::provider::{BookingTokens, ConfirmedBooking, MemberInfo};

use super::PROVIDER;

/// Maps the status text printed in the time table onto [`SlotStatus`].
pub(super) fn slot_status(text: &str) -> SlotStatus {
    match text.trim() {
        "예약가능" | "가능" => SlotStatus::Available,
        "예약완료" | "예약중" | "마감" => SlotStatus::Reserved,
        _ => SlotStatus::Unavailable,
    }
}

/// Parses one facility's time table for one date.
///
/// A page with a table but no data rows has no slots. A page with no table
/// at all means the layout changed.
pub(super) fn parse_time_table(
    html: &str,
    facility: &str,
    date: NaiveDate,
    directory: &CourtDirectory,
) -> ProviderResult<Vec<Reservation>> {
    if !html.to_ascii_lowercase().contains("<table") {
        return Err(shape_error(
            PROVIDER,
            format!("time table missing for {} on {}", facility, date),
        ));
    }

    let court = directory.facility_name(facility);
    let mut reservations = Vec::new();
    for cells in table_rows(html) {
        // "No data" rows span the whole table with a single cell.
        if cells.len() == 1 {
            continue;
        }
        let [name, time, status, ..] = cells.as_slice() else {
            warn!(provider = PROVIDER, markup_shape = "short row", facility, cells = cells.len(), "Skipping time table row");
            continue;
        };
        let Some((start_time, end_time)) = parse_range(time) else {
            warn!(provider = PROVIDER, markup_shape = "time range", facility, time = %time, "Skipping time table row");
            continue;
        };

        let court_num = directory
            .court_by_name(facility, name)
            .map(|c| c.label.clone())
            .unwrap_or_else(|| directory.display_label(facility, name));

        reservations.push(Reservation {
            court: court.clone(),
            date,
            court_num,
            start_time,
            end_time,
            status: slot_status(status),
        });
    }

    Ok(reservations)
}

/// Scrapes the echo tokens, member fields and price from the confirm page.
pub(super) fn parse_confirm_page(html: &str) -> ProviderResult<ConfirmedBooking> {
    let alert = alert_message(html);
    let token = |name: &str| {
        extract_token(html, name).ok_or_else(|| match &alert {
            Some(alert) => shape_error(
                PROVIDER,
                format!("confirm page has no {} token (alert: {})", name, alert),
            ),
            None => shape_error(PROVIDER, format!("confirm page has no {} token", name)),
        })
    };
    let tokens = BookingTokens {
        vo_str: token("voStr")?,
        time_str: token("timeStr")?,
    };

    let field = |name: &str| hidden_input(html, name).filter(|v| !v.trim().is_empty());
    Ok(ConfirmedBooking {
        tokens,
        member: MemberInfo {
            name: field("rsvNm"),
            phone: field("rsvTel"),
        },
        price: field("totalPrice")
            .or_else(|| field("payAmt"))
            .and_then(|p| parse_amount(&p)),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    result_code: Value,
}

/// Decodes the finalize response into a reservation id.
pub(super) fn parse_commit(body: &str) -> ProviderResult<String> {
    let response: CommitResponse = serde_json::from_str(body)
        .map_err(|e| shape_error(PROVIDER, format!("commit response: {}", e)))?;
    let raw = match response.result_code {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(shape_error(PROVIDER, format!("commit result {}", other))),
    };
    decode_commit_code(&raw)
        .into_result()
        .map_err(|e| e.with_provider(PROVIDER))
}

/// Interprets the cancellation response.
///
/// The site has no structured success flag: a 200 page is a success unless
/// it carries an `alert(...)`, which is how refusals are shown.
pub(super) fn parse_cancel(html: &str) -> ProviderResult<()> {
    match alert_message(html) {
        Some(alert) => Err(ProviderError::cancellation_rejected(alert).with_provider(PROVIDER)),
        None => Ok(()),
    }
}
