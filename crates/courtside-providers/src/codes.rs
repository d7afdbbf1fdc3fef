//! Decoding of the commit result code returned by finalize.
//!
//! Both sites answer the commit with a bare string code. This is the only
//! place those codes are interpreted.

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};

/// A decoded finalize result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitCode {
    /// Positive numeric code: the upstream reservation id.
    Committed(String),
    /// `"err"`: outside the booking window.
    TimeWindow,
    /// `"-3"`: the member may not book this court.
    Eligibility,
    /// `"-1"`: the slot was taken first.
    SlotConflict,
    /// Anything else, kept verbatim.
    Unknown(String),
}

/// Decodes a raw result code. Surrounding whitespace and quotes are ignored.
pub fn decode_commit_code(raw: &str) -> CommitCode {
    let code = raw.trim().trim_matches('"').trim();
    match code {
        "err" => CommitCode::TimeWindow,
        "-3" => CommitCode::Eligibility,
        "-1" => CommitCode::SlotConflict,
        c if is_positive_number(c) => CommitCode::Committed(c.to_string()),
        c => CommitCode::Unknown(c.to_string()),
    }
}

fn is_positive_number(code: &str) -> bool {
    !code.is_empty()
        && code.bytes().all(|b| b.is_ascii_digit())
        && code.bytes().any(|b| b != b'0')
}

impl CommitCode {
    /// The raw code this value was decoded from.
    pub fn raw(&self) -> &str {
        match self {
            Self::Committed(id) | Self::Unknown(id) => id,
            Self::TimeWindow => "err",
            Self::Eligibility => "-3",
            Self::SlotConflict => "-1",
        }
    }

    /// Converts to the reservation id or a classified error carrying the raw
    /// code.
    pub fn into_result(self) -> ProviderResult<String> {
        let raw = self.raw().to_string();
        let (code, message) = match self {
            Self::Committed(id) => return Ok(id),
            Self::TimeWindow => (
                ProviderErrorCode::TimeWindowRejection,
                "booking window is not open".to_string(),
            ),
            Self::Eligibility => (
                ProviderErrorCode::EligibilityRejection,
                "member is not eligible for this court".to_string(),
            ),
            Self::SlotConflict => (
                ProviderErrorCode::SlotConflictRejection,
                "slot already booked".to_string(),
            ),
            Self::Unknown(ref c) => (
                ProviderErrorCode::UnknownProvider,
                format!("unrecognized result code {:?}", c),
            ),
        };
        Err(ProviderError::new(code, message).with_raw_code(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_known_code() {
        assert_eq!(decode_commit_code("12345"), CommitCode::Committed("12345".into()));
        assert_eq!(decode_commit_code("err"), CommitCode::TimeWindow);
        assert_eq!(decode_commit_code("-3"), CommitCode::Eligibility);
        assert_eq!(decode_commit_code("-1"), CommitCode::SlotConflict);
        assert_eq!(decode_commit_code(" \"778\" "), CommitCode::Committed("778".into()));
    }

    #[test]
    fn zero_and_other_values_are_unknown() {
        assert_eq!(decode_commit_code("0"), CommitCode::Unknown("0".into()));
        assert_eq!(decode_commit_code("-2"), CommitCode::Unknown("-2".into()));
        assert_eq!(decode_commit_code(""), CommitCode::Unknown("".into()));
        assert_eq!(decode_commit_code("ERR"), CommitCode::Unknown("ERR".into()));
    }

    #[test]
    fn rejections_keep_raw_code() {
        let err = decode_commit_code("-1").into_result().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::SlotConflictRejection);
        assert_eq!(err.raw_code(), Some("-1"));
        assert!(!err.is_retryable());

        let err = decode_commit_code("-9").into_result().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::UnknownProvider);
        assert_eq!(err.raw_code(), Some("-9"));

        let err = decode_commit_code("err").into_result().unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::TimeWindowRejection);
    }

    #[test]
    fn committed_yields_id() {
        assert_eq!(decode_commit_code("2024001").into_result().unwrap(), "2024001");
    }
}
