//! Usage totals from approved reports.
//!
//! Minutes are summed first and converted to hours once per bucket, rounded to
//! one decimal place half away from zero.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::domain::status::RequestType;

const MONTHS_SHOWN: usize = 12;

/// One approved report with a complete activity window.
#[derive(Debug, Clone, Copy)]
pub struct UsageRecord {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub request_type: RequestType,
}

impl UsageRecord {
    /// Whole minutes; an end before the start counts as nothing.
    pub fn minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }
}

pub fn round_hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HoursByType {
    pub outing: f64,
    pub home: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthUsage {
    pub month: String,
    pub total_minutes: i64,
    pub total_hours: f64,
    pub by_type: HoursByType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub monthly: Vec<MonthUsage>,
    pub current_month: MonthUsage,
}

#[derive(Default)]
struct Bucket {
    outing: i64,
    home: i64,
}

impl Bucket {
    fn add(&mut self, record: &UsageRecord) {
        match record.request_type {
            RequestType::Outing => self.outing += record.minutes(),
            RequestType::Home => self.home += record.minutes(),
        }
    }

    fn into_month(self, month: String) -> MonthUsage {
        let total = self.outing + self.home;
        MonthUsage {
            month,
            total_minutes: total,
            total_hours: round_hours(total),
            by_type: HoursByType {
                outing: round_hours(self.outing),
                home: round_hours(self.home),
            },
        }
    }
}

/// First day of the month twelve months before `today`.
pub fn window_start(today: NaiveDate) -> NaiveDate {
    let first = today.with_day(1).unwrap_or(today);
    first.checked_sub_months(Months::new(12)).unwrap_or(first)
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn summarize(records: &[UsageRecord], today: NaiveDate) -> UsageStats {
    let from = window_start(today);
    let current_key = month_key(today);

    let mut months: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut current = Bucket::default();

    for record in records {
        let key = month_key(record.date);
        if key == current_key {
            current.add(record);
        }
        if record.date >= from {
            months.entry(key).or_default().add(record);
        }
    }

    let monthly = months
        .into_iter()
        .rev()
        .take(MONTHS_SHOWN)
        .map(|(month, bucket)| bucket.into_month(month))
        .collect();

    UsageStats {
        monthly,
        current_month: current.into_month(current_key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: (i32, u32, u32), start: (u32, u32), end: (u32, u32), ty: RequestType) -> UsageRecord {
        UsageRecord {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            request_type: ty,
        }
    }

    #[test]
    fn hundred_five_minutes_is_one_point_eight_hours() {
        let r = record((2026, 3, 2), (9, 0), (10, 45), RequestType::Outing);
        assert_eq!(r.minutes(), 105);
        assert_eq!(round_hours(105), 1.8);
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        // 3 minutes is 0.05h
        assert_eq!(round_hours(3), 0.1);
        assert_eq!(round_hours(0), 0.0);
        assert_eq!(round_hours(90), 1.5);
    }

    #[test]
    fn negative_span_counts_as_zero() {
        let r = record((2026, 3, 2), (11, 0), (10, 0), RequestType::Home);
        assert_eq!(r.minutes(), 0);
    }

    #[test]
    fn window_starts_twelve_months_back() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(window_start(today), NaiveDate::from_ymd_opt(2025, 10, 1).unwrap());
    }

    #[test]
    fn monthly_is_newest_first_and_split_by_type() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let records = [
            record((2026, 10, 1), (9, 0), (10, 45), RequestType::Outing),
            record((2026, 10, 5), (13, 0), (14, 0), RequestType::Home),
            record((2026, 8, 3), (9, 0), (9, 30), RequestType::Outing),
            record((2025, 9, 30), (9, 0), (12, 0), RequestType::Outing),
        ];

        let stats = summarize(&records, today);
        let months: Vec<_> = stats.monthly.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2026-10", "2026-08"]);

        let october = &stats.monthly[0];
        assert_eq!(october.total_minutes, 165);
        assert_eq!(october.total_hours, 2.8);
        assert_eq!(october.by_type, HoursByType { outing: 1.8, home: 1.0 });

        assert_eq!(stats.current_month, *october);
    }

    #[test]
    fn empty_current_month_is_zeroed() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let stats = summarize(&[], today);
        assert!(stats.monthly.is_empty());
        assert_eq!(stats.current_month.month, "2026-01");
        assert_eq!(stats.current_month.total_minutes, 0);
        assert_eq!(stats.current_month.by_type, HoursByType::default());
    }
}
