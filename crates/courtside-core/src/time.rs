//! Wall-clock slot times.
//!
//! Both upstream sites describe slots with bare `HH:MM` strings (sometimes
//! `HH:MM:SS`) in local time. [`SlotTime`] keeps minute precision and renders
//! in the two shapes the rest of the system needs: `HH:MM` for display and
//! `HH:MM:SS` on the snapshot wire format.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when a slot time string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid slot time: {input:?}")]
pub struct SlotTimeError {
    input: String,
}

/// A minute-precision time of day.
///
/// Not a `chrono::NaiveTime`: the sites close the last slot of the day with
/// `24:00`, which `NaiveTime` cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime {
    minutes: u16,
}

impl SlotTime {
    /// Latest representable value; `24:00` closes a slot ending at midnight.
    const MAX_MINUTES: u16 = 24 * 60;

    /// Creates a slot time from hour and minute, if in range.
    pub fn new(hour: u16, minute: u16) -> Option<Self> {
        let minutes = hour.checked_mul(60)?.checked_add(minute)?;
        if minute >= 60 || minutes > Self::MAX_MINUTES {
            return None;
        }
        Some(Self { minutes })
    }

    pub fn hour(&self) -> u16 {
        self.minutes / 60
    }

    pub fn minute(&self) -> u16 {
        self.minutes % 60
    }

    /// Minutes since midnight.
    pub fn as_minutes(&self) -> u16 {
        self.minutes
    }

    /// Renders as `HH:MM:SS`, the form stored in cache snapshots.
    pub fn to_hms(&self) -> String {
        format!("{:02}:{:02}:00", self.hour(), self.minute())
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for SlotTime {
    type Err = SlotTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SlotTimeError {
            input: s.to_string(),
        };
        let mut parts = s.trim().split(':');
        let hour = parts.next().ok_or_else(err)?;
        let minute = parts.next().ok_or_else(err)?;
        // Seconds are accepted but must be zero; slots never start mid-minute.
        if let Some(seconds) = parts.next() {
            if seconds.parse::<u16>().map_err(|_| err())? != 0 {
                return Err(err());
            }
        }
        if parts.next().is_some() {
            return Err(err());
        }

        let hour: u16 = hour.trim().parse().map_err(|_| err())?;
        let minute: u16 = minute.trim().parse().map_err(|_| err())?;
        Self::new(hour, minute).ok_or_else(err)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hms())
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a `HH:MM~HH:MM` (or `HH:MM - HH:MM`) range as rendered by the
/// provider pages.
pub fn parse_range(s: &str) -> Option<(SlotTime, SlotTime)> {
    let (start, end) = s.split_once('~').or_else(|| s.split_once('-'))?;
    let start: SlotTime = start.trim().parse().ok()?;
    let end: SlotTime = end.trim().parse().ok()?;
    (start < end).then_some((start, end))
}

/// Renders a range in the `HH:MM~HH:MM` report form.
pub fn format_range(start: SlotTime, end: SlotTime) -> String {
    format!("{}~{}", start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        let short: SlotTime = "06:00".parse().unwrap();
        let long: SlotTime = "06:00:00".parse().unwrap();
        assert_eq!(short, long);
        assert_eq!(short.hour(), 6);
        assert_eq!(short.to_string(), "06:00");
        assert_eq!(short.to_hms(), "06:00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<SlotTime>().is_err());
        assert!("25:00".parse::<SlotTime>().is_err());
        assert!("10:61".parse::<SlotTime>().is_err());
        assert!("10:00:30".parse::<SlotTime>().is_err());
        assert!("ten:00".parse::<SlotTime>().is_err());
    }

    #[test]
    fn midnight_end_is_allowed() {
        let end: SlotTime = "24:00".parse().unwrap();
        assert_eq!(end.as_minutes(), 1440);
    }

    #[test]
    fn range_parsing() {
        let (start, end) = parse_range("13:00~14:00").unwrap();
        assert_eq!(format_range(start, end), "13:00~14:00");

        let (start, end) = parse_range(" 06:00 - 08:00 ").unwrap();
        assert_eq!(start.to_string(), "06:00");
        assert_eq!(end.to_string(), "08:00");

        assert!(parse_range("14:00~13:00").is_none());
        assert!(parse_range("코트").is_none());
    }

    #[test]
    fn serde_uses_hms() {
        let t: SlotTime = "19:30".parse().unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"19:30:00\"");
        let back: SlotTime = serde_json::from_str("\"19:30\"").unwrap();
        assert_eq!(back, t);
    }
}
