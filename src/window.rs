use chrono::{Months, NaiveDate};
use clap::ValueEnum;

use crate::models::MeasurementRecord;

/// Relative time range applied before any aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Window {
    #[default]
    All,
    #[value(name = "3m")]
    Last3Months,
    #[value(name = "6m")]
    Last6Months,
    #[value(name = "12m")]
    Last12Months,
}

impl Window {
    pub fn label(self) -> &'static str {
        match self {
            Window::All => "",
            Window::Last3Months => "Last 3 months",
            Window::Last6Months => "Last 6 months",
            Window::Last12Months => "Last 12 months",
        }
    }

    fn span(self) -> Option<Months> {
        match self {
            Window::All => None,
            Window::Last3Months => Some(Months::new(3)),
            Window::Last6Months => Some(Months::new(6)),
            Window::Last12Months => Some(Months::new(12)),
        }
    }

    /// First date included by the window, or `None` when unbounded.
    /// Month subtraction clamps to the last day of a shorter month, so
    /// 31 May minus 3 months is 28/29 February.
    pub fn cutoff(self, today: NaiveDate) -> Option<NaiveDate> {
        let span = self.span()?;
        Some(today.checked_sub_months(span).unwrap_or(NaiveDate::MIN))
    }
}

/// Keeps the records dated on or after the window's cutoff, in input order.
///
/// Records whose occasion date could not be parsed are dropped by bounded
/// windows, as if they were older than any cutoff. `Window::All` keeps them.
pub fn filter(
    records: &[MeasurementRecord],
    window: Window,
    today: NaiveDate,
) -> Vec<MeasurementRecord> {
    let Some(cutoff) = window.cutoff(today) else {
        return records.to_vec();
    };

    records
        .iter()
        .filter(|record| record.date.is_some_and(|date| date >= cutoff))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scores;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_record(id: &str, date: Option<NaiveDate>) -> MeasurementRecord {
        MeasurementRecord {
            id: id.to_string(),
            resident_id: "A".to_string(),
            date,
            date_raw: date.map(|d| d.to_string()).unwrap_or_else(|| "unknown".to_string()),
            occasion_label: String::new(),
            scores: Scores::default(),
            missing_metrics: Vec::new(),
            notes: String::new(),
            recorded_by: String::new(),
            recorded_date: String::new(),
            timestamp: String::new(),
            row: None,
        }
    }

    fn ids(records: &[MeasurementRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    fn fixture() -> Vec<MeasurementRecord> {
        vec![
            sample_record("recent", Some(ymd(2024, 6, 1))),
            sample_record("old", Some(ymd(2023, 1, 1))),
            sample_record("undated", None),
            sample_record("edge", Some(ymd(2024, 3, 15))),
            sample_record("mid", Some(ymd(2023, 12, 1))),
        ]
    }

    #[test]
    fn all_returns_input_unchanged() {
        let records = fixture();
        for today in [ymd(2024, 6, 15), ymd(1999, 1, 1)] {
            assert_eq!(filter(&records, Window::All, today), records);
        }
    }

    #[test]
    fn cutoff_is_inclusive() {
        let records = fixture();
        let kept = filter(&records, Window::Last3Months, ymd(2024, 6, 15));
        assert_eq!(ids(&kept), vec!["recent", "edge"]);
    }

    #[test]
    fn wider_windows_preserve_order() {
        let records = fixture();
        let today = ymd(2024, 6, 15);
        assert_eq!(
            ids(&filter(&records, Window::Last6Months, today)),
            vec!["recent", "edge"]
        );
        assert_eq!(
            ids(&filter(&records, Window::Last12Months, today)),
            vec!["recent", "edge", "mid"]
        );
    }

    #[test]
    fn undated_records_only_survive_all() {
        let records = fixture();
        let today = ymd(2024, 6, 15);
        assert!(ids(&filter(&records, Window::All, today)).contains(&"undated"));
        assert!(!ids(&filter(&records, Window::Last12Months, today)).contains(&"undated"));
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = fixture();
        let today = ymd(2024, 6, 15);
        for window in [Window::Last3Months, Window::Last6Months, Window::Last12Months] {
            let once = filter(&records, window, today);
            assert_eq!(filter(&once, Window::All, today), once);
            assert_eq!(filter(&once, window, today), once);
        }
    }

    #[test]
    fn month_subtraction_is_calendar_aware() {
        assert_eq!(Window::Last3Months.cutoff(ymd(2024, 5, 31)), Some(ymd(2024, 2, 29)));
        assert_eq!(Window::Last6Months.cutoff(ymd(2023, 8, 31)), Some(ymd(2023, 2, 28)));
        assert_eq!(Window::Last12Months.cutoff(ymd(2024, 2, 29)), Some(ymd(2023, 2, 28)));
        assert_eq!(Window::All.cutoff(ymd(2024, 2, 29)), None);
    }
}
