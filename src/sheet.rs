use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::ingest::{self, RawRow};
use crate::models::{MeasurementRecord, RowRef};

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("request to measurement service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("measurement service answered HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("measurement service error: {0}")]
    Service(String),

    #[error("could not decode service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("service response is missing the data array")]
    MissingData,
}

/// Reply envelope shared by every endpoint of the service.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<Vec<RawRow>>,
}

impl Envelope {
    fn into_result(self) -> Result<Option<Vec<RawRow>>, SheetError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(SheetError::Service(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a> {
    action: &'static str,
    brukar_id: &'a str,
    datum: &'a str,
    tillfalle: &'a str,
    vas_livskvalitet: f64,
    vas_maende: f64,
    whodas: f64,
    audit: f64,
    dudit: f64,
    anteckningar: &'a str,
    registrerad_av: &'a str,
    registreringsdatum: &'a str,
    id: &'a str,
    row_index: Option<RowRef>,
}

impl<'a> SaveRequest<'a> {
    fn new(record: &'a MeasurementRecord, editing: Option<RowRef>) -> Self {
        Self {
            action: "save",
            brukar_id: &record.resident_id,
            datum: &record.date_raw,
            tillfalle: &record.occasion_label,
            vas_livskvalitet: record.scores.quality_of_life_vas,
            vas_maende: record.scores.mood_vas,
            whodas: record.scores.whodas,
            audit: record.scores.audit,
            dudit: record.scores.dudit,
            anteckningar: &record.notes,
            registrerad_av: &record.recorded_by,
            registreringsdatum: &record.recorded_date,
            id: &record.id,
            row_index: editing,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct DeleteRequest {
    action: &'static str,
    row_index: RowRef,
}

/// Client for the spreadsheet-backed web service that stores measurements.
#[derive(Debug, Clone)]
pub struct SheetClient {
    http: reqwest::Client,
    url: String,
}

impl SheetClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SheetError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// Downloads the full collection. The result replaces whatever the caller
    /// held before; nothing is merged.
    pub async fn fetch(&self) -> Result<Vec<MeasurementRecord>, SheetError> {
        debug!(url = %self.url, "fetching measurements");
        let response = self.http.get(&self.url).send().await?;
        let rows = read_envelope(response).await?.ok_or(SheetError::MissingData)?;
        let records = ingest::ingest_rows(&rows);
        info!(count = records.len(), "measurements loaded");
        Ok(records)
    }

    /// Creates the record, or overwrites the row at `editing` when given.
    pub async fn save(
        &self,
        record: &MeasurementRecord,
        editing: Option<RowRef>,
    ) -> Result<(), SheetError> {
        let request = SaveRequest::new(record, editing);
        debug!(id = %record.id, row = ?editing, "saving measurement");
        self.post(&request).await?;
        info!(id = %record.id, updated = editing.is_some(), "measurement saved");
        Ok(())
    }

    pub async fn delete(&self, row: RowRef) -> Result<(), SheetError> {
        let request = DeleteRequest {
            action: "delete",
            row_index: row,
        };
        debug!(row = row.0, "deleting measurement");
        self.post(&request).await?;
        info!(row = row.0, "measurement deleted");
        Ok(())
    }

    async fn post<T: Serialize>(&self, body: &T) -> Result<(), SheetError> {
        // The service parses the raw body; it expects JSON sent as text/plain.
        let payload = serde_json::to_string(body)?;
        let response = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=utf-8")
            .body(payload)
            .send()
            .await?;
        read_envelope(response).await?;
        Ok(())
    }
}

async fn read_envelope(response: reqwest::Response) -> Result<Option<Vec<RawRow>>, SheetError> {
    let status = response.status();
    if !status.is_success() {
        return Err(SheetError::Status(status));
    }
    let body = response.text().await?;
    parse_envelope(&body)
}

fn parse_envelope(body: &str) -> Result<Option<Vec<RawRow>>, SheetError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    envelope.into_result()
}
