use std::collections::HashSet;

use chrono::NaiveDate;

use crate::improvement::{self, MetricOutcome};
use crate::models::{MeasurementRecord, Metric};
use crate::window::{self, Window};

/// Shown in place of a mean when the window holds no records.
pub const NO_DATA: &str = "-";

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub window: Window,
    pub cutoff: Option<NaiveDate>,
    pub unique_resident_count: usize,
    pub record_count: usize,
    /// Rounded to one decimal; `None` when there is nothing to average.
    pub mean_quality_of_life_vas: Option<f64>,
    pub mean_mood_vas: Option<f64>,
    pub metric_outcomes: Vec<MetricOutcome>,
}

impl Summary {
    pub fn has_trends(&self) -> bool {
        !improvement::has_no_trends(&self.metric_outcomes)
    }
}

pub fn summarize(records: &[MeasurementRecord], window: Window, today: NaiveDate) -> Summary {
    let filtered = window::filter(records, window, today);

    let unique_resident_count = filtered
        .iter()
        .map(|record| record.resident_id.as_str())
        .collect::<HashSet<_>>()
        .len();

    Summary {
        window,
        cutoff: window.cutoff(today),
        unique_resident_count,
        record_count: filtered.len(),
        mean_quality_of_life_vas: mean(&filtered, Metric::QualityOfLifeVas),
        mean_mood_vas: mean(&filtered, Metric::MoodVas),
        metric_outcomes: improvement::analyze(&filtered),
    }
}

fn mean(records: &[MeasurementRecord], metric: Metric) -> Option<f64> {
    if records.is_empty() {
        return None;
    }
    let total: f64 = records.iter().map(|record| record.metric(metric)).sum();
    Some(round_one_decimal(total / records.len() as f64))
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_mean(mean: Option<f64>) -> String {
    match mean {
        Some(value) => format!("{value:.1}"),
        None => NO_DATA.to_string(),
    }
}
