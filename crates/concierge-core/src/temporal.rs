//! # Timestamps
//!
//! Case records and transition logs carry [`Timestamp`]: a UTC instant at
//! whole-second resolution that serializes as `YYYY-MM-DDTHH:MM:SSZ`.
//! Input in any RFC 3339 offset is accepted and converted to UTC.

use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConciergeError;

const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A UTC instant with sub-second precision dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(0))
    }

    /// Parse RFC 3339 text.
    pub fn parse(text: &str) -> Result<Self, ConciergeError> {
        DateTime::parse_from_rfc3339(text)
            .map(|instant| Self::from_utc(instant.with_timezone(&Utc)))
            .map_err(|e| ConciergeError::Validation(format!("invalid timestamp {text:?}: {e}")))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = ConciergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn now_is_whole_seconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn sub_seconds_are_dropped() {
        let instant = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 15, 7)
            .unwrap()
            .with_nanosecond(999_000_000)
            .unwrap();
        assert_eq!(Timestamp::from_utc(instant).to_string(), "2026-03-02T09:15:07Z");
    }

    #[test]
    fn offsets_convert_to_utc() {
        let ts: Timestamp = "2026-03-02T14:45:00+05:30".parse().unwrap();
        assert_eq!(ts.to_string(), "2026-03-02T09:15:00Z");
    }

    #[test]
    fn garbage_is_a_validation_error() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(ConciergeError::Validation(_))
        ));
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn orders_chronologically() {
        let opened = Timestamp::parse("2026-03-02T09:15:00Z").unwrap();
        let closed = Timestamp::parse("2026-03-02T09:15:01Z").unwrap();
        assert!(opened < closed);
    }

    #[test]
    fn serializes_as_utc_string() {
        let ts = Timestamp::parse("2026-03-02T09:15:00.250Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, r#""2026-03-02T09:15:00Z""#);
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }

    #[test]
    fn rejects_non_string_json() {
        assert!(serde_json::from_str::<Timestamp>("1767225600").is_err());
    }
}
