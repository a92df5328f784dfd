//! Report periods
//!
//! Ids are deterministic business keys (`WB-2026-W07`, `MB-2026-03`,
//! `QB-2026-Q1`, `YB-2026`); bounds are UTC `[start, end)` in millis.

use chrono::{Datelike, NaiveDate, Weekday};
use shared::error::{AppError, ErrorCode};
use shared::models::ReportPeriodType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub period_type: ReportPeriodType,
    pub year: i32,
    /// ISO week, month or quarter; 0 for yearly
    pub number: u32,
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::with_message(ErrorCode::InvalidReportPeriod, msg)
}

fn midnight_millis(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

impl ReportPeriod {
    pub fn new(period_type: ReportPeriodType, year: i32, number: Option<u32>) -> Result<Self, AppError> {
        if !(2000..=9999).contains(&year) {
            return Err(invalid(format!("year out of range: {year}")));
        }
        let number = match period_type {
            ReportPeriodType::Yearly => 0,
            _ => number.ok_or_else(|| invalid("period number is required"))?,
        };
        let valid = match period_type {
            ReportPeriodType::Weekly => NaiveDate::from_isoywd_opt(year, number, Weekday::Mon).is_some(),
            ReportPeriodType::Monthly => (1..=12).contains(&number),
            ReportPeriodType::Quarterly => (1..=4).contains(&number),
            ReportPeriodType::Yearly => true,
        };
        if !valid {
            return Err(invalid(format!(
                "{} {number} does not exist in {year}",
                period_type.as_str()
            )));
        }
        Ok(Self {
            period_type,
            year,
            number,
        })
    }

    pub fn id(&self) -> String {
        match self.period_type {
            ReportPeriodType::Weekly => format!("WB-{}-W{:02}", self.year, self.number),
            ReportPeriodType::Monthly => format!("MB-{}-{:02}", self.year, self.number),
            ReportPeriodType::Quarterly => format!("QB-{}-Q{}", self.year, self.number),
            ReportPeriodType::Yearly => format!("YB-{}", self.year),
        }
    }

    /// Parse an id produced by [`ReportPeriod::id`]
    ///
    /// Only the canonical spelling is accepted (`MB-2026-03`, not `MB-2026-3`).
    pub fn from_id(id: &str) -> Option<Self> {
        let (prefix, rest) = id.split_once('-')?;
        let (year, number, period_type) = match prefix {
            "YB" => (rest, None, ReportPeriodType::Yearly),
            "WB" => {
                let (y, w) = rest.split_once("-W")?;
                (y, Some(w), ReportPeriodType::Weekly)
            }
            "MB" => {
                let (y, m) = rest.split_once('-')?;
                (y, Some(m), ReportPeriodType::Monthly)
            }
            "QB" => {
                let (y, q) = rest.split_once("-Q")?;
                (y, Some(q), ReportPeriodType::Quarterly)
            }
            _ => return None,
        };
        let year = year.parse().ok()?;
        let number = match number {
            Some(n) => Some(n.parse().ok()?),
            None => None,
        };
        let period = Self::new(period_type, year, number).ok()?;
        (period.id() == id).then_some(period)
    }

    /// Whether the whole period lies before `now_millis`
    pub fn has_ended(&self, now_millis: i64) -> bool {
        self.bounds().1 <= now_millis
    }

    fn start_date(&self) -> Option<NaiveDate> {
        match self.period_type {
            ReportPeriodType::Weekly => NaiveDate::from_isoywd_opt(self.year, self.number, Weekday::Mon),
            ReportPeriodType::Monthly => NaiveDate::from_ymd_opt(self.year, self.number, 1),
            ReportPeriodType::Quarterly => NaiveDate::from_ymd_opt(self.year, (self.number - 1) * 3 + 1, 1),
            ReportPeriodType::Yearly => NaiveDate::from_ymd_opt(self.year, 1, 1),
        }
    }

    fn end_date(&self, start: NaiveDate) -> Option<NaiveDate> {
        let months_after = |months: u32| {
            let total = start.month0() + months;
            NaiveDate::from_ymd_opt(start.year() + (total / 12) as i32, total % 12 + 1, 1)
        };
        match self.period_type {
            ReportPeriodType::Weekly => start.checked_add_days(chrono::Days::new(7)),
            ReportPeriodType::Monthly => months_after(1),
            ReportPeriodType::Quarterly => months_after(3),
            ReportPeriodType::Yearly => months_after(12),
        }
    }

    /// `[start, end)` in Unix millis, UTC
    pub fn bounds(&self) -> (i64, i64) {
        let Some(start) = self.start_date() else {
            return (0, 0);
        };
        let end = self.end_date(start).unwrap_or(start);
        (midnight_millis(start), midnight_millis(end))
    }
}
