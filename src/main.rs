use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};

mod config;
mod improvement;
mod ingest;
mod models;
mod report;
mod sheet;
mod stats;
mod transfer;
mod window;

use models::{MeasurementDraft, MeasurementRecord};
use sheet::SheetClient;
use window::Window;

#[derive(Parser)]
#[command(name = "wellbeing-tracker")]
#[command(about = "Record and review resident wellbeing measurements", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all measurements, newest first
    List,
    /// Show key figures and improvement trends
    Stats {
        #[arg(long, value_enum, default_value_t = Window::All)]
        window: Window,
    },
    /// Record a new measurement
    Add {
        #[arg(long)]
        resident: String,
        /// Occasion date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Update an existing measurement; omitted fields keep their value
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long)]
        resident: Option<String>,
        #[arg(long)]
        date: Option<String>,
        #[command(flatten)]
        fields: EntryFields,
    },
    /// Delete a measurement
    Delete {
        #[arg(long)]
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Save every row of a CSV file as a new measurement
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Write all measurements to a CSV file
    Export {
        #[arg(long, default_value = "measurements.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, value_enum, default_value_t = Window::All)]
        window: Window,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[derive(Args, Default)]
struct EntryFields {
    #[arg(long)]
    occasion: Option<String>,
    #[arg(long)]
    quality_of_life: Option<f64>,
    #[arg(long)]
    mood: Option<f64>,
    #[arg(long)]
    whodas: Option<f64>,
    #[arg(long)]
    audit: Option<f64>,
    #[arg(long)]
    dudit: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long)]
    recorded_by: Option<String>,
}

impl EntryFields {
    fn apply(self, draft: &mut MeasurementDraft) {
        if let Some(value) = self.occasion {
            draft.occasion_label = value;
        }
        if let Some(value) = self.quality_of_life {
            draft.scores.quality_of_life_vas = value;
        }
        if let Some(value) = self.mood {
            draft.scores.mood_vas = value;
        }
        if let Some(value) = self.whodas {
            draft.scores.whodas = value;
        }
        if let Some(value) = self.audit {
            draft.scores.audit = value;
        }
        if let Some(value) = self.dudit {
            draft.scores.dudit = value;
        }
        if let Some(value) = self.notes {
            draft.notes = value;
        }
        if let Some(value) = self.recorded_by {
            draft.recorded_by = value;
        }
    }
}

fn find_by_id<'a>(records: &'a [MeasurementRecord], id: &str) -> anyhow::Result<&'a MeasurementRecord> {
    records
        .iter()
        .find(|record| record.id == id)
        .with_context(|| format!("no measurement with id {id}"))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::from_env()?;
    let client = SheetClient::new(&config.script_url, config.timeout)
        .context("failed to build HTTP client")?;

    match cli.command {
        Commands::List => {
            let records = client.fetch().await.context("failed to load measurements")?;
            print!("{}", report::format_list(&records));
        }
        Commands::Stats { window } => {
            let records = client.fetch().await.context("failed to load measurements")?;
            let summary = stats::summarize(&records, window, today());
            print!("{}", report::format_stats(&summary));
        }
        Commands::Add {
            resident,
            date,
            fields,
        } => {
            let today = today();
            let mut draft = MeasurementDraft {
                resident_id: resident,
                date: date.unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
                ..MeasurementDraft::default()
            };
            fields.apply(&mut draft);
            let record = draft.into_record(None, today)?;

            client.save(&record, None).await.context("failed to save measurement")?;
            let records = client.fetch().await.context("failed to reload measurements")?;
            println!("Measurement saved ({} measurements in total).", records.len());
        }
        Commands::Edit {
            id,
            resident,
            date,
            fields,
        } => {
            let records = client.fetch().await.context("failed to load measurements")?;
            let existing = find_by_id(&records, &id)?;
            let row = existing
                .row
                .with_context(|| format!("measurement {id} has no sheet row"))?;

            let mut draft = MeasurementDraft::from_record(existing);
            if let Some(value) = resident {
                draft.resident_id = value;
            }
            if let Some(value) = date {
                draft.date = value;
            }
            fields.apply(&mut draft);
            let record = draft.into_record(Some(existing.id.clone()), today())?;

            client
                .save(&record, Some(row))
                .await
                .context("failed to update measurement")?;
            client.fetch().await.context("failed to reload measurements")?;
            println!("Measurement updated.");
        }
        Commands::Delete { id, yes } => {
            let records = client.fetch().await.context("failed to load measurements")?;
            let existing = find_by_id(&records, &id)?;
            let row = existing
                .row
                .with_context(|| format!("measurement {id} has no sheet row"))?;

            let prompt = format!(
                "Delete measurement for {} on {}?",
                existing.resident_id, existing.date_raw
            );
            if !yes && !confirm(&prompt)? {
                println!("Nothing deleted.");
                return Ok(());
            }

            client.delete(row).await.context("failed to delete measurement")?;
            client.fetch().await.context("failed to reload measurements")?;
            println!("Measurement deleted.");
        }
        Commands::Import { csv } => {
            let inserted = transfer::import_csv(&client, &csv, today()).await?;
            println!("Inserted {inserted} measurements from {}.", csv.display());
        }
        Commands::Export { out } => {
            let records = client.fetch().await.context("failed to load measurements")?;
            transfer::export_csv(&out, &records)?;
            println!("Exported {} measurements to {}.", records.len(), out.display());
        }
        Commands::Report { window, out } => {
            let today = today();
            let records = client.fetch().await.context("failed to load measurements")?;
            let summary = stats::summarize(&records, window, today);
            let report = report::build_report(&summary, &records, today);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_window_names() {
        let cli = Cli::try_parse_from(["wellbeing-tracker", "stats", "--window", "6m"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Stats {
                window: Window::Last6Months
            }
        ));
        assert!(Cli::try_parse_from(["wellbeing-tracker", "stats", "--window", "2w"]).is_err());
    }

    #[test]
    fn entry_fields_only_override_given_values() {
        let mut draft = MeasurementDraft {
            resident_id: "A".to_string(),
            occasion_label: "Intake".to_string(),
            ..MeasurementDraft::default()
        };
        draft.scores.whodas = 40.0;
        EntryFields {
            mood: Some(7.0),
            ..EntryFields::default()
        }
        .apply(&mut draft);
        assert_eq!(draft.occasion_label, "Intake");
        assert_eq!(draft.scores.whodas, 40.0);
        assert_eq!(draft.scores.mood_vas, 7.0);
    }
}
