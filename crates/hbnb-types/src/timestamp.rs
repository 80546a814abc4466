//! Creation / modification timestamps
//!
//! Timestamps are kept as the exact string that was stored. Values coming
//! back from storage are never reformatted or validated, so a record written
//! by another tool round-trips unchanged.

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Format used for every timestamp this crate generates (UTC, microseconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(String);

impl Timestamp {
    /// Current UTC time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now().naive_utc())
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        Self(dt.format(TIMESTAMP_FORMAT).to_string())
    }

    /// A fresh timestamp strictly later than `prev`.
    ///
    /// If the clock has not moved past `prev` (or went backwards), the result
    /// is `prev` plus one microsecond. An unparsable `prev` is ignored.
    pub fn after(prev: &Timestamp) -> Self {
        let now = Utc::now().naive_utc();
        match prev.parse() {
            Some(p) if now <= p => Self::from_datetime(p + Duration::microseconds(1)),
            _ => Self::from_datetime(now),
        }
    }

    /// Parse the stored string, if it has the expected shape
    pub fn parse(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, PARSE_FORMAT).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Timestamp {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Timestamp {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_timestamp_parses() {
        let ts = Timestamp::now();
        assert!(ts.parse().is_some());
    }

    #[test]
    fn test_parses_isoformat_without_fraction() {
        let ts = Timestamp::from("2017-09-28T21:03:54");
        assert!(ts.parse().is_some());
    }

    #[test]
    fn test_after_is_strictly_later() {
        // Far in the future, so the clock cannot have caught up
        let prev = Timestamp::from("2999-01-01T00:00:00.000000");
        let next = Timestamp::after(&prev);
        assert_eq!(next.as_str(), "2999-01-01T00:00:00.000001");

        let past = Timestamp::from("2001-01-01T00:00:00.000000");
        assert!(Timestamp::after(&past).parse() > past.parse());
    }

    #[test]
    fn test_garbage_is_kept_verbatim() {
        let ts = Timestamp::from("not a date");
        assert_eq!(ts.as_str(), "not a date");
        assert!(ts.parse().is_none());
        assert!(Timestamp::after(&ts).parse().is_some());
    }
}
