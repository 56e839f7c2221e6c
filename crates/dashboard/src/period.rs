use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The reporting windows a user can pick on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PeriodSelector {
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    #[default]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "1y")]
    OneYear,
}

impl PeriodSelector {
    pub const ALL: [PeriodSelector; 4] = [
        PeriodSelector::SevenDays,
        PeriodSelector::ThirtyDays,
        PeriodSelector::NinetyDays,
        PeriodSelector::OneYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodSelector::SevenDays => "7d",
            PeriodSelector::ThirtyDays => "30d",
            PeriodSelector::NinetyDays => "90d",
            PeriodSelector::OneYear => "1y",
        }
    }
}

impl fmt::Display for PeriodSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PeriodSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "7d" => Ok(PeriodSelector::SevenDays),
            "30d" => Ok(PeriodSelector::ThirtyDays),
            "90d" => Ok(PeriodSelector::NinetyDays),
            "1y" => Ok(PeriodSelector::OneYear),
            other => Err(format!(
                "unsupported period '{}', expected one of 7d, 30d, 90d, 1y",
                other
            )),
        }
    }
}

/// Half-open `[start, end)` time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if start >= end {
            return Err(format!("period start {} is not before end {}", start, end));
        }
        Ok(Self { start, end })
    }

    /// The window `selector` covers when looking back from `now`.
    pub fn resolve(selector: PeriodSelector, now: DateTime<Utc>) -> Self {
        let start = match selector {
            PeriodSelector::SevenDays => now - Duration::days(7),
            PeriodSelector::ThirtyDays => now - Duration::days(30),
            PeriodSelector::NinetyDays => now - Duration::days(90),
            PeriodSelector::OneYear => now - Months::new(12),
        };
        Self { start, end: now }
    }

    /// The equal-length window ending where this one starts.
    pub fn previous(&self) -> Self {
        let length = self.end - self.start;
        Self {
            start: self.start - length,
            end: self.start,
        }
    }

    /// From the first instant of the month `months - 1` months before `now`'s
    /// month, up to `now`. Zero months is treated as one.
    pub fn trailing_months(months: u32, now: DateTime<Utc>) -> Self {
        let first_month = month_start(now.date_naive()) - Months::new(months.saturating_sub(1));
        let start = first_month.and_time(chrono::NaiveTime::MIN).and_utc();
        Self { start, end: now }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// First day of the calendar month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Number of days from `date` through the last day of its month, both included.
pub fn days_remaining_in_month(date: NaiveDate) -> i64 {
    let next_month = month_start(date) + Months::new(1);
    (next_month - date).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!("7d".parse::<PeriodSelector>().unwrap(), PeriodSelector::SevenDays);
        assert_eq!(" 1y ".parse::<PeriodSelector>().unwrap(), PeriodSelector::OneYear);
        assert!("2w".parse::<PeriodSelector>().is_err());
        assert!("".parse::<PeriodSelector>().is_err());
        for selector in PeriodSelector::ALL {
            assert_eq!(selector.as_str().parse::<PeriodSelector>().unwrap(), selector);
        }
    }

    #[test]
    fn test_resolve_windows() {
        let now = at(2024, 9, 16);
        let p = Period::resolve(PeriodSelector::ThirtyDays, now);
        assert_eq!(p.end(), now);
        assert_eq!(p.start(), at(2024, 8, 17));

        let year = Period::resolve(PeriodSelector::OneYear, now);
        assert_eq!(year.start(), at(2023, 9, 16));
    }

    #[test]
    fn test_previous_is_adjacent_and_equal_length() {
        let p = Period::resolve(PeriodSelector::SevenDays, at(2024, 9, 16));
        let prev = p.previous();
        assert_eq!(prev.end(), p.start());
        assert_eq!(prev.end() - prev.start(), p.end() - p.start());
    }

    #[test]
    fn test_new_rejects_empty_window() {
        let now = at(2024, 9, 16);
        assert!(Period::new(now, now).is_err());
        assert!(Period::new(now, now - Duration::days(1)).is_err());
        assert!(Period::new(now - Duration::days(1), now).is_ok());
    }

    #[test]
    fn test_contains_is_half_open() {
        let p = Period::new(at(2024, 9, 1), at(2024, 9, 2)).unwrap();
        assert!(p.contains(at(2024, 9, 1)));
        assert!(!p.contains(at(2024, 9, 2)));
    }

    #[test]
    fn test_trailing_months() {
        let p = Period::trailing_months(6, at(2024, 3, 10));
        assert_eq!(p.start(), Utc.with_ymd_and_hms(2023, 10, 1, 0, 0, 0).unwrap());
        assert_eq!(p.end(), at(2024, 3, 10));
    }

    #[test]
    fn test_days_remaining_in_month() {
        assert_eq!(days_remaining_in_month(NaiveDate::from_ymd_opt(2024, 9, 19).unwrap()), 12);
        assert_eq!(days_remaining_in_month(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()), 1);
        assert_eq!(days_remaining_in_month(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()), 31);
    }
}
