//! Delta timestamps and the freshness rule applied before any merge or delete.
//!
//! Deltas carry a fixed-width 20 digit UTC timestamp, `yyyyMMddHHmmssSSSSSS`,
//! with microsecond resolution. It is parsed into an absolute instant so that
//! ordering never depends on string comparison.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SyncError};

/// Length of the wire format.
pub const DELTA_AT_LEN: usize = 20;

const SECONDS_PART_LEN: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeltaAt(DateTime<Utc>);

impl DeltaAt {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.len() != DELTA_AT_LEN || !raw.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SyncError::bad_request(format!(
                "delta_at must be a {DELTA_AT_LEN} digit yyyyMMddHHmmssSSSSSS timestamp, got '{raw}'"
            )));
        }

        let (seconds, micros) = raw.split_at(SECONDS_PART_LEN);
        let naive = NaiveDateTime::parse_from_str(seconds, "%Y%m%d%H%M%S").map_err(|err| {
            SyncError::bad_request(format!("delta_at '{raw}' is not a valid date: {err}"))
        })?;
        let micros: i64 = micros
            .parse()
            .map_err(|_| SyncError::bad_request(format!("delta_at '{raw}' has invalid fraction")))?;

        Ok(Self(naive.and_utc() + Duration::microseconds(micros)))
    }

    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Renders the canonical wire form. Sub-microsecond precision is dropped.
    pub fn to_wire(&self) -> String {
        format!(
            "{}{:06}",
            self.0.format("%Y%m%d%H%M%S"),
            self.0.nanosecond() % 1_000_000_000 / 1_000
        )
    }
}

impl fmt::Display for DeltaAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl FromStr for DeltaAt {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for DeltaAt {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for DeltaAt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Freshness judge.
///
/// A candidate is stale only when it is strictly before the stored timestamp;
/// an equal timestamp is a redelivery and is accepted. Nothing stored means
/// nothing to be stale against. A candidate without a timestamp is reported
/// as not stale here; operations that need provenance must reject it first.
pub fn is_stale(candidate: Option<DeltaAt>, existing: Option<DeltaAt>) -> bool {
    match (candidate, existing) {
        (Some(candidate), Some(existing)) => candidate < existing,
        _ => false,
    }
}

/// Rejects `candidate` with a conflict when it is stale against `existing`.
pub fn ensure_fresh(
    company_number: &str,
    candidate: DeltaAt,
    existing: Option<DeltaAt>,
) -> Result<()> {
    if is_stale(Some(candidate), existing) {
        return Err(SyncError::StaleDelta {
            company_number: company_number.to_string(),
            candidate: candidate.to_wire(),
            stored: existing.map(|at| at.to_wire()).unwrap_or_default(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;

    fn at(raw: &str) -> DeltaAt {
        DeltaAt::parse(raw).unwrap()
    }

    #[test]
    fn parses_microsecond_precision() {
        let parsed = at("20240315123045123456");
        assert_eq!(
            parsed.as_datetime().to_rfc3339(),
            "2024-03-15T12:30:45.123456+00:00"
        );
        assert_eq!(parsed.to_wire(), "20240315123045123456");
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for raw in [
            "",
            "2024031512304512345",
            "202403151230451234567",
            "2024-03-15T12:30:45Z0",
            "20241315123045123456",
        ] {
            let err = DeltaAt::parse(raw).unwrap_err();
            assert_eq!(err.kind(), SyncErrorKind::BadRequest, "input {raw:?}");
        }
    }

    #[test]
    fn strictly_earlier_is_stale() {
        let stored = at("20240315123045123456");
        assert!(is_stale(Some(at("20240315123045123455")), Some(stored)));
        assert!(!is_stale(Some(stored), Some(stored)));
        assert!(!is_stale(Some(at("20240315123045123457")), Some(stored)));
    }

    #[test]
    fn missing_sides_are_never_stale() {
        let stored = at("20240315123045123456");
        assert!(!is_stale(Some(stored), None));
        assert!(!is_stale(None, Some(stored)));
        assert!(!is_stale(None, None));
    }

    #[test]
    fn ensure_fresh_reports_both_timestamps() {
        let err = ensure_fresh(
            "00006400",
            at("20230101000000000000"),
            Some(at("20240101000000000000")),
        )
        .unwrap_err();
        assert_eq!(
            err,
            SyncError::StaleDelta {
                company_number: "00006400".to_string(),
                candidate: "20230101000000000000".to_string(),
                stored: "20240101000000000000".to_string(),
            }
        );
    }

    #[test]
    fn serde_uses_wire_format() {
        let value = serde_json::to_value(at("20240315123045000001")).unwrap();
        assert_eq!(value, serde_json::json!("20240315123045000001"));
        let back: DeltaAt = serde_json::from_value(value).unwrap();
        assert_eq!(back, at("20240315123045000001"));
    }
}
