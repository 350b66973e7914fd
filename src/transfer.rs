use std::io::{Read, Write};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::{MeasurementDraft, MeasurementRecord, Scores};
use crate::sheet::SheetClient;

#[derive(Debug, Deserialize)]
struct ImportRow {
    resident_id: String,
    date: String,
    #[serde(default)]
    occasion: String,
    quality_of_life_vas: f64,
    mood_vas: f64,
    whodas: f64,
    audit: f64,
    dudit: f64,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    recorded_by: String,
}

impl From<ImportRow> for MeasurementDraft {
    fn from(row: ImportRow) -> Self {
        MeasurementDraft {
            resident_id: row.resident_id,
            date: row.date,
            occasion_label: row.occasion,
            scores: Scores {
                quality_of_life_vas: row.quality_of_life_vas,
                mood_vas: row.mood_vas,
                whodas: row.whodas,
                audit: row.audit,
                dudit: row.dudit,
            },
            notes: row.notes,
            recorded_by: row.recorded_by,
        }
    }
}

#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    resident_id: &'a str,
    date: &'a str,
    occasion: &'a str,
    quality_of_life_vas: f64,
    mood_vas: f64,
    whodas: f64,
    audit: f64,
    dudit: f64,
    notes: &'a str,
    recorded_by: &'a str,
    recorded_date: &'a str,
}

impl<'a> From<&'a MeasurementRecord> for ExportRow<'a> {
    fn from(record: &'a MeasurementRecord) -> Self {
        ExportRow {
            id: &record.id,
            resident_id: &record.resident_id,
            date: &record.date_raw,
            occasion: &record.occasion_label,
            quality_of_life_vas: record.scores.quality_of_life_vas,
            mood_vas: record.scores.mood_vas,
            whodas: record.scores.whodas,
            audit: record.scores.audit,
            dudit: record.scores.dudit,
            notes: &record.notes,
            recorded_by: &record.recorded_by,
            recorded_date: &record.recorded_date,
        }
    }
}

/// Parses and validates every row before anything is sent, so a bad file
/// leaves the remote sheet untouched.
pub fn read_import<R: Read>(
    reader: R,
    today: NaiveDate,
) -> anyhow::Result<Vec<MeasurementRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for (index, result) in reader.deserialize::<ImportRow>().enumerate() {
        // header is line 1
        let line = index + 2;
        let row = result.with_context(|| format!("invalid CSV row on line {line}"))?;
        let record = MeasurementDraft::from(row)
            .into_record(None, today)
            .with_context(|| format!("invalid measurement on line {line}"))?;
        records.push(record);
    }

    Ok(records)
}

pub async fn import_csv(
    client: &SheetClient,
    csv_path: &Path,
    today: NaiveDate,
) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let records = read_import(file, today)?;

    let mut inserted = 0usize;
    for record in &records {
        client
            .save(record, None)
            .await
            .with_context(|| format!("failed to save measurement for {}", record.resident_id))?;
        inserted += 1;
    }

    info!(inserted, path = %csv_path.display(), "import finished");
    Ok(inserted)
}

pub fn write_export<W: Write>(writer: W, records: &[MeasurementRecord]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv(out: &Path, records: &[MeasurementRecord]) -> anyhow::Result<()> {
    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_export(file, records)
}
