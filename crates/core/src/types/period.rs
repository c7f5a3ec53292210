//! Reporting windows for the staff dashboard.
//!
//! Every window is a half-open UTC range `[start, end)` so consecutive
//! windows never double count an order placed exactly at midnight.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ReportPeriod`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsePeriodError {
    /// The `period` value is not recognised.
    #[error("unknown report period: {0}")]
    Unknown(String),
    /// `period=month` without a usable `YYYY-MM` month.
    #[error("month must be formatted as YYYY-MM")]
    InvalidMonth,
}

/// Bucket size for a sales series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
}

impl Granularity {
    /// Unit name accepted by `date_trunc`.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
        }
    }

    /// `strftime` pattern used for chart labels.
    #[must_use]
    pub const fn label_format(self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Month => "%Y-%m",
        }
    }
}

/// A caller-selected reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    Last7Days,
    #[default]
    Last30Days,
    ThisYear,
    Month {
        year: i32,
        month: u32,
    },
}

impl ReportPeriod {
    /// Parse the `period` and `month` query parameters.
    ///
    /// A missing or empty `period` gives the default (last 30 days).
    ///
    /// # Errors
    ///
    /// Returns an error for unknown periods, or for `month` without a valid
    /// `YYYY-MM` value.
    pub fn from_query(period: Option<&str>, month: Option<&str>) -> Result<Self, ParsePeriodError> {
        match period.map(str::trim).unwrap_or_default() {
            "" => Ok(Self::default()),
            "today" => Ok(Self::Today),
            "7d" | "week" => Ok(Self::Last7Days),
            "30d" | "month_to_date" => Ok(Self::Last30Days),
            "year" => Ok(Self::ThisYear),
            "month" => {
                let (year, month) = month
                    .and_then(parse_year_month)
                    .ok_or(ParsePeriodError::InvalidMonth)?;
                Ok(Self::Month { year, month })
            }
            other => Err(ParsePeriodError::Unknown(other.to_owned())),
        }
    }

    /// Query-string value for this period.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Last7Days => "7d",
            Self::Last30Days => "30d",
            Self::ThisYear => "year",
            Self::Month { .. } => "month",
        }
    }

    /// Label shown above the dashboard figures.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Today => "Today".to_owned(),
            Self::Last7Days => "Last 7 days".to_owned(),
            Self::Last30Days => "Last 30 days".to_owned(),
            Self::ThisYear => "This year".to_owned(),
            Self::Month { year, month } => format!("{year:04}-{month:02}"),
        }
    }

    /// `YYYY-MM` for a custom month, used to refill the month picker.
    #[must_use]
    pub fn month_value(&self) -> Option<String> {
        match self {
            Self::Month { year, month } => Some(format!("{year:04}-{month:02}")),
            _ => None,
        }
    }

    /// Bucket size for a sales series over this window.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        match self {
            Self::ThisYear => Granularity::Month,
            _ => Granularity::Day,
        }
    }

    /// The `[start, end)` range this period covers, relative to `now`.
    ///
    /// Rolling windows end at the next UTC midnight so today's orders are
    /// always included.
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let today = now.date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
        match *self {
            Self::Today => (midnight(today), midnight(tomorrow)),
            Self::Last7Days => (midnight(days_before(today, 6)), midnight(tomorrow)),
            Self::Last30Days => (midnight(days_before(today, 29)), midnight(tomorrow)),
            Self::ThisYear => {
                let start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
                let end = NaiveDate::from_ymd_opt(today.year() + 1, 1, 1).unwrap_or(tomorrow);
                (midnight(start), midnight(end))
            }
            Self::Month { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today);
                let end = start.checked_add_months(chrono::Months::new(1)).unwrap_or(start);
                (midnight(start), midnight(end))
            }
        }
    }
}

fn parse_year_month(s: &str) -> Option<(i32, u32)> {
    let (year, month) = s.trim().split_once('-')?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1).map(|_| (year, month))
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 15, 30, 0).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_known_periods() {
        assert_eq!(ReportPeriod::from_query(None, None), Ok(ReportPeriod::Last30Days));
        assert_eq!(ReportPeriod::from_query(Some("today"), None), Ok(ReportPeriod::Today));
        assert_eq!(ReportPeriod::from_query(Some("7d"), None), Ok(ReportPeriod::Last7Days));
        assert_eq!(ReportPeriod::from_query(Some("year"), None), Ok(ReportPeriod::ThisYear));
        assert_eq!(
            ReportPeriod::from_query(Some("month"), Some("2023-11")),
            Ok(ReportPeriod::Month { year: 2023, month: 11 })
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(
            ReportPeriod::from_query(Some("fortnight"), None),
            Err(ParsePeriodError::Unknown("fortnight".to_owned()))
        );
        assert_eq!(
            ReportPeriod::from_query(Some("month"), None),
            Err(ParsePeriodError::InvalidMonth)
        );
        assert_eq!(
            ReportPeriod::from_query(Some("month"), Some("2023-13")),
            Err(ParsePeriodError::InvalidMonth)
        );
        assert_eq!(
            ReportPeriod::from_query(Some("month"), Some("23-01")),
            Err(ParsePeriodError::InvalidMonth)
        );
    }

    #[test]
    fn test_today_window() {
        assert_eq!(ReportPeriod::Today.window(now()), (at(2024, 3, 9), at(2024, 3, 10)));
    }

    #[test]
    fn test_rolling_windows_include_today() {
        assert_eq!(
            ReportPeriod::Last7Days.window(now()),
            (at(2024, 3, 3), at(2024, 3, 10))
        );
        assert_eq!(
            ReportPeriod::Last30Days.window(now()),
            (at(2024, 2, 9), at(2024, 3, 10))
        );
    }

    #[test]
    fn test_year_window() {
        assert_eq!(
            ReportPeriod::ThisYear.window(now()),
            (at(2024, 1, 1), at(2025, 1, 1))
        );
        assert_eq!(ReportPeriod::ThisYear.granularity(), Granularity::Month);
    }

    #[test]
    fn test_custom_month_window_handles_december() {
        let period = ReportPeriod::Month { year: 2023, month: 12 };
        assert_eq!(period.window(now()), (at(2023, 12, 1), at(2024, 1, 1)));
        assert_eq!(period.month_value().as_deref(), Some("2023-12"));
        assert_eq!(period.granularity(), Granularity::Day);
    }
}
