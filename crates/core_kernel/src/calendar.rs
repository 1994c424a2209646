//! Firm calendar
//!
//! Due dates and fiscal years are plain calendar dates in the firm's local
//! timezone. "Today" therefore has to be computed in that timezone rather
//! than in UTC, or invoices due today would flip to overdue an hour early in
//! Douala.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::error::CoreError;

/// Default IANA zone for the firm
pub const DEFAULT_TIMEZONE: &str = "Africa/Douala";

/// Timezone wrapper with string serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timezone::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Parses an IANA zone name such as `Africa/Douala`
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        Tz::from_str(name.trim())
            .map(Timezone)
            .map_err(|_| CoreError::configuration(format!("Invalid timezone: {}", name)))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Calendar date of `instant` in this zone
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.0).date_naive()
    }

    /// Current calendar date in this zone
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// Current fiscal year (the calendar year of today)
    pub fn current_year(&self) -> i32 {
        self.today().year()
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::Africa::Douala)
    }
}

/// Fiscal year containing `date`
pub fn fiscal_year_of(date: NaiveDate) -> i32 {
    date.year()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_is_douala() {
        assert_eq!(Timezone::default().name(), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_date_of_crosses_midnight() {
        // 23:30 UTC on Dec 31 is already Jan 1 in Douala (UTC+1)
        let instant = Utc.with_ymd_and_hms(2024, 12, 31, 23, 30, 0).unwrap();
        let date = Timezone::default().date_of(instant);
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(fiscal_year_of(date), 2025);
    }

    #[test]
    fn test_parse_rejects_unknown_zone() {
        assert!(Timezone::parse("Mars/Olympus").is_err());
        assert_eq!(Timezone::parse(" UTC ").unwrap().name(), "UTC");
    }

    #[test]
    fn test_serde_roundtrip() {
        let tz = Timezone::parse("Europe/Paris").unwrap();
        let json = serde_json::to_string(&tz).unwrap();
        assert_eq!(json, "\"Europe/Paris\"");
        let back: Timezone = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tz);
    }
}
