use std::fmt::Write;

use chrono::NaiveDate;

use crate::improvement::MetricOutcome;
use crate::models::MeasurementRecord;
use crate::stats::{format_mean, Summary};

const BAR_WIDTH: usize = 20;

/// Records ordered newest occasion first. Same-day records keep their order
/// and undated ones go last.
pub fn newest_first(records: &[MeasurementRecord]) -> Vec<&MeasurementRecord> {
    let mut sorted: Vec<&MeasurementRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

pub fn format_list(records: &[MeasurementRecord]) -> String {
    let mut output = String::new();

    if records.is_empty() {
        let _ = writeln!(
            output,
            "No measurements recorded yet. Use `add` to record the first one."
        );
        return output;
    }

    let _ = writeln!(
        output,
        "{:<12} {:<12} {:<18} {:>6} {:>6} {:>7} {:>6} {:>6}  {}",
        "resident", "date", "occasion", "QoL", "mood", "WHODAS", "AUDIT", "DUDIT", "id"
    );
    for record in newest_first(records) {
        let flag = if record.has_missing_metrics() { " *" } else { "" };
        let _ = writeln!(
            output,
            "{:<12} {:<12} {:<18} {:>6} {:>6} {:>7} {:>6} {:>6}  {}{}",
            record.resident_id,
            record.date_raw,
            record.occasion_label,
            record.scores.quality_of_life_vas,
            record.scores.mood_vas,
            record.scores.whodas,
            record.scores.audit,
            record.scores.dudit,
            record.id,
            flag
        );
    }

    if records.iter().any(MeasurementRecord::has_missing_metrics) {
        let _ = writeln!(output);
        let _ = writeln!(output, "* one or more scores were missing and are shown as 0");
    }

    output
}

pub fn format_stats(summary: &Summary) -> String {
    let mut output = String::new();

    if !summary.window.label().is_empty() {
        let _ = writeln!(output, "{}", summary.window.label());
    }
    let _ = writeln!(output, "Residents:            {}", summary.unique_resident_count);
    let _ = writeln!(output, "Measurements:         {}", summary.record_count);
    let _ = writeln!(
        output,
        "Avg quality of life:  {}",
        format_mean(summary.mean_quality_of_life_vas)
    );
    let _ = writeln!(output, "Avg mood:             {}", format_mean(summary.mean_mood_vas));
    let _ = writeln!(output);
    let _ = writeln!(output, "Share of residents improved");

    if !summary.has_trends() {
        let _ = writeln!(
            output,
            "Not enough data. Needs at least 2 measurements per resident."
        );
        return output;
    }

    for outcome in &summary.metric_outcomes {
        let improved = outcome.percentages().map_or(0, |pct| pct.improved);
        let _ = writeln!(
            output,
            "{:<22} {} {:>3}%",
            outcome.metric.display_name(),
            bar(improved),
            improved
        );
    }

    let _ = writeln!(output);
    for outcome in &summary.metric_outcomes {
        if let Some(line) = outcome_breakdown(outcome) {
            let _ = writeln!(output, "{line}");
        }
    }

    output
}

fn bar(percent: u32) -> String {
    let filled = (percent as usize * BAR_WIDTH + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn outcome_breakdown(outcome: &MetricOutcome) -> Option<String> {
    let pct = outcome.percentages()?;
    Some(format!(
        "{}: improved {}%, worsened {}%, stable {}% (n={})",
        outcome.metric.display_name(),
        pct.improved,
        pct.worsened,
        pct.stable,
        outcome.total()
    ))
}

pub fn build_report(
    summary: &Summary,
    records: &[MeasurementRecord],
    generated_on: NaiveDate,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Resident Wellbeing Report");
    match summary.cutoff {
        Some(cutoff) => {
            let _ = writeln!(
                output,
                "Generated {} ({}, occasions since {})",
                generated_on,
                summary.window.label(),
                cutoff
            );
        }
        None => {
            let _ = writeln!(output, "Generated {} (all occasions)", generated_on);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Residents: {}", summary.unique_resident_count);
    let _ = writeln!(output, "- Measurements: {}", summary.record_count);
    let _ = writeln!(
        output,
        "- Average quality of life (VAS): {}",
        format_mean(summary.mean_quality_of_life_vas)
    );
    let _ = writeln!(
        output,
        "- Average mood (VAS): {}",
        format_mean(summary.mean_mood_vas)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Improvement Since First Measurement");

    if !summary.has_trends() {
        let _ = writeln!(
            output,
            "Not enough data. Needs at least 2 measurements per resident."
        );
    } else {
        let _ = writeln!(output, "| Metric | Improved | Worsened | Stable | Residents |");
        let _ = writeln!(output, "|---|---|---|---|---|");
        for outcome in &summary.metric_outcomes {
            let Some(pct) = outcome.percentages() else {
                continue;
            };
            let _ = writeln!(
                output,
                "| {} | {}% | {}% | {}% | {} |",
                outcome.metric.display_name(),
                pct.improved,
                pct.worsened,
                pct.stable,
                outcome.total()
            );
        }
    }

    let in_window: Vec<&MeasurementRecord> = newest_first(records)
        .into_iter()
        .filter(|record| match (summary.cutoff, record.date) {
            (None, _) => true,
            (Some(cutoff), Some(date)) => date >= cutoff,
            (Some(_), None) => false,
        })
        .collect();

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Occasion Notes");

    let noted: Vec<&&MeasurementRecord> = in_window
        .iter()
        .filter(|record| !record.notes.trim().is_empty())
        .take(5)
        .collect();
    if noted.is_empty() {
        let _ = writeln!(output, "No notes recorded for this window.");
    } else {
        for record in noted {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                record.resident_id, record.occasion_label, record.date_raw, record.notes
            );
        }
    }

    let incomplete = in_window
        .iter()
        .filter(|record| record.has_missing_metrics())
        .count();
    if incomplete > 0 {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "_{incomplete} measurement(s) had missing scores counted as 0._"
        );
    }

    output
}
