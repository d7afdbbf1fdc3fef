//! `courtside book`

use std::path::Path;
use std::sync::Arc;

use courtside_core::TimeSlotRequest;
use courtside_engine::BookingOrchestrator;
use courtside_providers::AbortHandle;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Reads the slot list from `path`.
pub fn load_slots(path: &Path) -> ClientResult<Vec<TimeSlotRequest>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ClientError::Input(format!("failed to read {}: {}", path.display(), e)))?;
    let slots: Vec<TimeSlotRequest> = serde_json::from_str(&content)
        .map_err(|e| ClientError::Input(format!("{}: {}", path.display(), e)))?;
    if slots.is_empty() {
        return Err(ClientError::Input(format!("{} lists no slots", path.display())));
    }
    Ok(slots)
}

/// Books the slots in `slots_file` and prints the report.
///
/// Fails with [`ClientError::Incomplete`] after printing if any slot was not
/// booked.
pub async fn run(
    config: &ClientConfig,
    slots_file: &Path,
    no_alerts: bool,
    abort: AbortHandle,
) -> ClientResult<()> {
    let slots = load_slots(slots_file)?;

    let directory = Arc::new(config.directory());
    let providers = config.providers(&directory).map_err(ClientError::Config)?;
    let credentials = config.credentials().map_err(ClientError::Config)?;

    let mut options = config.booking_options();
    if no_alerts {
        options = options.with_alerts(false);
    }

    let report = BookingOrchestrator::new(providers, directory, options)
        .book(&credentials, &slots, abort)
        .await?;
    super::print_json(&report)?;

    for entry in report.success_list.iter().filter(|e| e.warning.is_some()) {
        eprintln!(
            "warning: slot {}: {}",
            entry.slot_index,
            entry.warning.as_deref().unwrap_or_default()
        );
    }
    if !report.indeterminate_list.is_empty() {
        eprintln!(
            "warning: {} slot(s) may or may not have been booked; check your reservations on the site",
            report.indeterminate_list.len()
        );
    }

    if report.all_succeeded() {
        Ok(())
    } else {
        Err(ClientError::Incomplete(format!(
            "{} of {} slots were not booked",
            report.failed_list.len() + report.indeterminate_list.len(),
            report.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_slots_without_court_codes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"courtId": "bulam-2", "date": "2025-05-10", "startTime": "13:00", "endTime": "14:00"}}]"#
        )
        .unwrap();

        let slots = load_slots(file.path()).unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].court_id, "bulam-2");
        assert_eq!(slots[0].time_label(), "13:00~14:00");
        assert!(slots[0].provider_court_code.is_empty());
    }

    #[test]
    fn empty_slot_list_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[]").unwrap();
        assert!(matches!(load_slots(file.path()), Err(ClientError::Input(_))));
    }

    #[test]
    fn malformed_time_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"courtId": "bulam-2", "date": "2025-05-10", "startTime": "25:00", "endTime": "14:00"}}]"#
        )
        .unwrap();
        assert!(matches!(load_slots(file.path()), Err(ClientError::Input(_))));
    }
}
