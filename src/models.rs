use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// One of the five scores recorded on every measurement occasion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    QualityOfLifeVas,
    MoodVas,
    Whodas,
    Audit,
    Dudit,
}

impl Metric {
    /// Declaration order, also the order outcomes are reported in.
    pub const ALL: [Metric; 5] = [
        Metric::QualityOfLifeVas,
        Metric::MoodVas,
        Metric::Whodas,
        Metric::Audit,
        Metric::Dudit,
    ];

    /// Column label used by the tabular-data service.
    pub fn label(self) -> &'static str {
        match self {
            Metric::QualityOfLifeVas => "VAS Livskvalitet",
            Metric::MoodVas => "VAS Mående",
            Metric::Whodas => "WHODAS",
            Metric::Audit => "AUDIT",
            Metric::Dudit => "DUDIT",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::QualityOfLifeVas => "Quality of life (VAS)",
            Metric::MoodVas => "Mood (VAS)",
            Metric::Whodas => "WHODAS",
            Metric::Audit => "AUDIT",
            Metric::Dudit => "DUDIT",
        }
    }
}

/// Positional reference of a record inside the remote sheet. Only the
/// persistence client reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowRef(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Scores {
    pub quality_of_life_vas: f64,
    pub mood_vas: f64,
    pub whodas: f64,
    pub audit: f64,
    pub dudit: f64,
}

impl Scores {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::QualityOfLifeVas => self.quality_of_life_vas,
            Metric::MoodVas => self.mood_vas,
            Metric::Whodas => self.whodas,
            Metric::Audit => self.audit,
            Metric::Dudit => self.dudit,
        }
    }

    pub fn set(&mut self, metric: Metric, value: f64) {
        let slot = match metric {
            Metric::QualityOfLifeVas => &mut self.quality_of_life_vas,
            Metric::MoodVas => &mut self.mood_vas,
            Metric::Whodas => &mut self.whodas,
            Metric::Audit => &mut self.audit,
            Metric::Dudit => &mut self.dudit,
        };
        *slot = value;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub id: String,
    pub resident_id: String,
    /// Occasion date. `None` when the stored text could not be parsed.
    pub date: Option<NaiveDate>,
    /// Occasion date exactly as stored, kept for display and re-submission.
    pub date_raw: String,
    pub occasion_label: String,
    pub scores: Scores,
    /// Metrics that were absent or non-numeric at ingestion and defaulted to 0.
    pub missing_metrics: Vec<Metric>,
    pub notes: String,
    pub recorded_by: String,
    pub recorded_date: String,
    pub timestamp: String,
    pub row: Option<RowRef>,
}

impl MeasurementRecord {
    pub fn metric(&self, metric: Metric) -> f64 {
        self.scores.get(metric)
    }

    pub fn has_missing_metrics(&self) -> bool {
        !self.missing_metrics.is_empty()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DraftError {
    #[error("resident id must not be empty")]
    EmptyResident,

    #[error("invalid occasion date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{metric} must be a finite number")]
    NonFiniteMetric { metric: &'static str },
}

/// Values entered for a new or edited measurement, before validation.
#[derive(Debug, Clone, Default)]
pub struct MeasurementDraft {
    pub resident_id: String,
    pub date: String,
    pub occasion_label: String,
    pub scores: Scores,
    pub notes: String,
    pub recorded_by: String,
}

impl MeasurementDraft {
    /// Prefills a draft from an existing record, the starting point of an edit.
    /// A parsed occasion date is normalised to `YYYY-MM-DD`.
    pub fn from_record(record: &MeasurementRecord) -> Self {
        let date = record
            .date
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| record.date_raw.clone());
        Self {
            resident_id: record.resident_id.clone(),
            date,
            occasion_label: record.occasion_label.clone(),
            scores: record.scores,
            notes: record.notes.clone(),
            recorded_by: record.recorded_by.clone(),
        }
    }

    /// Validates the draft and stamps it with today's entry date. An existing
    /// id is kept so edits never change a record's identity.
    pub fn into_record(
        self,
        existing_id: Option<String>,
        today: NaiveDate,
    ) -> Result<MeasurementRecord, DraftError> {
        let resident_id = self.resident_id.trim().to_string();
        if resident_id.is_empty() {
            return Err(DraftError::EmptyResident);
        }

        let date_text = self.date.trim();
        let date = NaiveDate::parse_from_str(date_text, "%Y-%m-%d")
            .map_err(|_| DraftError::InvalidDate(self.date.clone()))?;

        for metric in Metric::ALL {
            if !self.scores.get(metric).is_finite() {
                return Err(DraftError::NonFiniteMetric {
                    metric: metric.label(),
                });
            }
        }

        let id = existing_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        Ok(MeasurementRecord {
            id,
            resident_id,
            date: Some(date),
            date_raw: date.format("%Y-%m-%d").to_string(),
            occasion_label: self.occasion_label,
            scores: self.scores,
            missing_metrics: Vec::new(),
            notes: self.notes,
            recorded_by: self.recorded_by,
            recorded_date: today.format("%Y-%m-%d").to_string(),
            timestamp: String::new(),
            row: None,
        })
    }
}
