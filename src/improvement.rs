use std::collections::HashMap;

use crate::models::{MeasurementRecord, Metric};

/// How a change in a metric is judged between a resident's first and last
/// occasion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricPolicy {
    /// Smallest absolute change that counts as a change at all.
    pub threshold: f64,
    pub higher_is_better: bool,
}

pub fn policy(metric: Metric) -> MetricPolicy {
    let (threshold, higher_is_better) = match metric {
        Metric::QualityOfLifeVas => (1.0, true),
        Metric::MoodVas => (1.0, true),
        Metric::Whodas => (5.0, false),
        Metric::Audit => (3.0, false),
        Metric::Dudit => (3.0, false),
    };
    MetricPolicy {
        threshold,
        higher_is_better,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improved,
    Worsened,
    Stable,
}

pub fn classify(delta: f64, policy: MetricPolicy) -> Trend {
    if delta.abs() < policy.threshold {
        Trend::Stable
    } else if (policy.higher_is_better && delta > 0.0) || (!policy.higher_is_better && delta < 0.0)
    {
        Trend::Improved
    } else {
        Trend::Worsened
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricOutcome {
    pub metric: Metric,
    pub improved: usize,
    pub worsened: usize,
    pub stable: usize,
}

/// Whole-number shares of a [`MetricOutcome`], in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomePercentages {
    pub improved: u32,
    pub worsened: u32,
    pub stable: u32,
}

impl MetricOutcome {
    fn empty(metric: Metric) -> Self {
        Self {
            metric,
            improved: 0,
            worsened: 0,
            stable: 0,
        }
    }

    fn record(&mut self, trend: Trend) {
        match trend {
            Trend::Improved => self.improved += 1,
            Trend::Worsened => self.worsened += 1,
            Trend::Stable => self.stable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.improved + self.worsened + self.stable
    }

    /// `None` when no resident qualified; callers hide the metric instead of
    /// showing 0%.
    pub fn percentages(&self) -> Option<OutcomePercentages> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let pct = |count: usize| (count as f64 / total as f64 * 100.0).round() as u32;
        Some(OutcomePercentages {
            improved: pct(self.improved),
            worsened: pct(self.worsened),
            stable: pct(self.stable),
        })
    }
}

/// Compares every resident's earliest and latest occasion and counts how each
/// metric moved. Residents with a single occasion are skipped.
///
/// Occasions on the same date keep their input order, so the first of them is
/// the earliest and the last is the latest. Undated occasions sort before all
/// dated ones.
pub fn analyze(records: &[MeasurementRecord]) -> Vec<MetricOutcome> {
    let mut outcomes: Vec<MetricOutcome> =
        Metric::ALL.into_iter().map(MetricOutcome::empty).collect();

    let mut order: Vec<&str> = Vec::new();
    let mut by_resident: HashMap<&str, Vec<&MeasurementRecord>> = HashMap::new();
    for record in records {
        let group = by_resident
            .entry(record.resident_id.as_str())
            .or_insert_with(|| {
                order.push(record.resident_id.as_str());
                Vec::new()
            });
        group.push(record);
    }

    for resident in order {
        let Some(group) = by_resident.get_mut(resident) else {
            continue;
        };
        if group.len() < 2 {
            continue;
        }

        // sort_by_key is stable
        group.sort_by_key(|record| record.date);
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };

        for outcome in outcomes.iter_mut() {
            let delta = last.metric(outcome.metric) - first.metric(outcome.metric);
            outcome.record(classify(delta, policy(outcome.metric)));
        }
    }

    outcomes
}

/// True when no metric has a single qualifying resident.
pub fn has_no_trends(outcomes: &[MetricOutcome]) -> bool {
    outcomes.iter().all(|outcome| outcome.total() == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scores;
    use chrono::NaiveDate;

    fn sample_record(resident: &str, date: &str, scores: Scores) -> MeasurementRecord {
        MeasurementRecord {
            id: format!("{resident}-{date}"),
            resident_id: resident.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            date_raw: date.to_string(),
            occasion_label: String::new(),
            scores,
            missing_metrics: Vec::new(),
            notes: String::new(),
            recorded_by: String::new(),
            recorded_date: String::new(),
            timestamp: String::new(),
            row: None,
        }
    }

    fn scores(qol: f64, mood: f64, whodas: f64, audit: f64, dudit: f64) -> Scores {
        Scores {
            quality_of_life_vas: qol,
            mood_vas: mood,
            whodas,
            audit,
            dudit,
        }
    }

    fn outcome(outcomes: &[MetricOutcome], metric: Metric) -> &MetricOutcome {
        outcomes.iter().find(|o| o.metric == metric).unwrap()
    }

    #[test]
    fn empty_input_yields_zeroed_outcomes_in_order() {
        let outcomes = analyze(&[]);
        let metrics: Vec<Metric> = outcomes.iter().map(|o| o.metric).collect();
        assert_eq!(metrics, Metric::ALL.to_vec());
        assert!(outcomes.iter().all(|o| o.total() == 0));
        assert!(has_no_trends(&outcomes));
    }

    #[test]
    fn single_occasion_residents_are_ignored() {
        let records = vec![
            sample_record("A", "2024-01-01", scores(0.0, 0.0, 0.0, 0.0, 0.0)),
            sample_record("B", "2024-01-01", scores(10.0, 10.0, 100.0, 40.0, 44.0)),
        ];
        assert!(has_no_trends(&analyze(&records)));
    }

    #[test]
    fn vas_threshold_separates_improved_from_stable() {
        let improved = vec![
            sample_record("R", "2024-01-01", scores(5.0, 5.0, 0.0, 0.0, 0.0)),
            sample_record("R", "2024-02-01", scores(7.0, 5.5, 0.0, 0.0, 0.0)),
        ];
        let outcomes = analyze(&improved);
        assert_eq!(outcome(&outcomes, Metric::QualityOfLifeVas).improved, 1);
        assert_eq!(outcome(&outcomes, Metric::MoodVas).stable, 1);
    }

    #[test]
    fn lower_is_better_for_screening_scores() {
        let records = vec![
            sample_record("R", "2024-01-01", scores(5.0, 5.0, 40.0, 10.0, 2.0)),
            sample_record("R", "2024-03-01", scores(5.0, 5.0, 30.0, 11.0, 8.0)),
        ];
        let outcomes = analyze(&records);
        assert_eq!(outcome(&outcomes, Metric::Whodas).improved, 1);
        assert_eq!(outcome(&outcomes, Metric::Audit).stable, 1);
        assert_eq!(outcome(&outcomes, Metric::Dudit).worsened, 1);
    }

    #[test]
    fn change_equal_to_threshold_counts() {
        let policy = policy(Metric::Whodas);
        assert_eq!(classify(5.0, policy), Trend::Worsened);
        assert_eq!(classify(-5.0, policy), Trend::Improved);
        assert_eq!(classify(4.99, policy), Trend::Stable);
    }

    #[test]
    fn compares_chronological_first_and_last() {
        let records = vec![
            sample_record("R", "2024-06-01", scores(9.0, 5.0, 0.0, 0.0, 0.0)),
            sample_record("R", "2024-01-01", scores(3.0, 5.0, 0.0, 0.0, 0.0)),
            sample_record("R", "2024-03-01", scores(1.0, 5.0, 0.0, 0.0, 0.0)),
        ];
        let outcomes = analyze(&records);
        assert_eq!(outcome(&outcomes, Metric::QualityOfLifeVas).improved, 1);
        assert_eq!(outcome(&outcomes, Metric::QualityOfLifeVas).total(), 1);
    }

    #[test]
    fn same_day_occasions_keep_input_order() {
        let records = vec![
            sample_record("R", "2024-01-01", scores(8.0, 5.0, 0.0, 0.0, 0.0)),
            sample_record("R", "2024-01-01", scores(2.0, 5.0, 0.0, 0.0, 0.0)),
        ];
        let outcomes = analyze(&records);
        assert_eq!(outcome(&outcomes, Metric::QualityOfLifeVas).worsened, 1);
        assert_eq!(outcome(&outcomes, Metric::QualityOfLifeVas).total(), 1);
    }

    #[test]
    fn totals_match_qualifying_residents_for_every_metric() {
        let records = vec![
            sample_record("A", "2024-01-01", scores(5.0, 5.0, 20.0, 3.0, 1.0)),
            sample_record("A", "2024-04-01", scores(8.0, 4.0, 12.0, 3.0, 9.0)),
            sample_record("B", "2024-02-01", scores(6.0, 6.0, 30.0, 8.0, 0.0)),
            sample_record("C", "2024-01-15", scores(2.0, 3.0, 50.0, 20.0, 12.0)),
            sample_record("C", "2024-05-15", scores(2.5, 1.0, 51.0, 14.0, 12.0)),
            sample_record("C", "2024-03-15", scores(9.0, 9.0, 9.0, 9.0, 9.0)),
        ];
        for outcome in analyze(&records) {
            assert_eq!(outcome.total(), 2, "{:?}", outcome.metric);
        }
    }

    #[test]
    fn percentages_round_and_hide_empty_metrics() {
        let outcome = MetricOutcome {
            metric: Metric::MoodVas,
            improved: 2,
            worsened: 1,
            stable: 0,
        };
        assert_eq!(
            outcome.percentages(),
            Some(OutcomePercentages {
                improved: 67,
                worsened: 33,
                stable: 0
            })
        );
        assert_eq!(MetricOutcome::empty(Metric::Audit).percentages(), None);
    }
}
