//! The import pipeline: read CSV rows, aggregate them into logical events,
//! synthesize schedules, and upsert events plus their categories through
//! storage. Dry-run mode previews the upserts without touching storage.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::aggregate::{AggregatedEvent, Aggregator};
use crate::categories::CategoryResolver;
use crate::error::{ImportError, Result};
use crate::normalize::normalize_row;
use crate::schedule::{synthesize_schedule, DerivedSchedule};
use crate::storage::Storage;
use crate::types::{Event, EventArgs, EventStatus, RawRow, UpsertOutcome};

/// Options for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub csv_path: PathBuf,
    /// Cap on distinct events admitted from the dataset.
    pub limit: Option<usize>,
    /// Preview only; no storage writes.
    pub dry_run: bool,
    /// Date the schedule phases are anchored to. Defaults to the local
    /// date; tests pin it for reproducible output.
    pub today: NaiveDate,
    /// When set, a JSON run report is written here (write mode only).
    pub report_dir: Option<PathBuf>,
}

impl ImportOptions {
    pub fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
            limit: None,
            dry_run: false,
            today: Local::now().date_naive(),
            report_dir: None,
        }
    }
}

/// Per-event record of what the run did.
#[derive(Debug, Clone, Serialize)]
pub struct EventOutcome {
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub registration_open_date: NaiveDate,
    pub registration_deadline: NaiveDate,
    pub status: EventStatus,
    pub categories: Vec<String>,
    pub source_rows: u32,
    pub outcome: UpsertOutcome,
}

/// Result of a complete import run.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub csv_path: String,
    pub total_rows: usize,
    pub parsed_rows: usize,
    pub unique_events: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub dry_run: bool,
    pub outcomes: Vec<EventOutcome>,
}

struct UpsertResult {
    outcome: UpsertOutcome,
    duplicate_updates: usize,
}

pub struct ImportPipeline {
    storage: Arc<dyn Storage>,
}

impl ImportPipeline {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Run the import end to end for one CSV file.
    #[instrument(skip(self, options), fields(csv = %options.csv_path.display()))]
    pub async fn run(&self, options: &ImportOptions) -> Result<ImportSummary> {
        if !options.csv_path.exists() {
            return Err(ImportError::CsvNotFound(options.csv_path.clone()));
        }

        info!("Reading data from {}", options.csv_path.display());
        println!("📄 Reading data from {}...", options.csv_path.display());

        let (events, total_rows, parsed_rows) = self.read_and_aggregate(options)?;

        let mut summary = ImportSummary {
            csv_path: options.csv_path.display().to_string(),
            total_rows,
            parsed_rows,
            unique_events: events.len(),
            created: 0,
            updated: 0,
            failed: 0,
            dry_run: options.dry_run,
            outcomes: Vec::new(),
        };

        if events.is_empty() {
            warn!("No events could be parsed from the dataset");
            println!("⚠️  No events could be parsed from the dataset.");
            return Ok(summary);
        }

        info!("Prepared {} unique events", events.len());
        println!("🗂  Prepared {} unique events.", events.len());

        let mut resolver = CategoryResolver::new();
        let mut previews: Vec<String> = Vec::new();

        for event in &events {
            let schedule = synthesize_schedule(event, options.today);

            if options.dry_run {
                let end_label = schedule.effective_end();
                previews.push(format!(
                    "[DRY RUN] Would upsert event: {} ({} - {}) [registration {} -> {}]",
                    event.title(),
                    schedule.start_date,
                    end_label,
                    schedule.registration_open_date,
                    schedule.registration_deadline
                ));
                continue;
            }

            match self.upsert_event(event, &schedule, &mut resolver).await {
                Ok(result) => {
                    match result.outcome {
                        UpsertOutcome::Created => summary.created += 1,
                        UpsertOutcome::Updated => summary.updated += 1,
                    }
                    summary.updated += result.duplicate_updates;
                    summary.outcomes.push(EventOutcome {
                        title: event.title(),
                        start_date: schedule.start_date,
                        end_date: schedule.end_date,
                        registration_open_date: schedule.registration_open_date,
                        registration_deadline: schedule.registration_deadline,
                        status: schedule.status,
                        categories: event.distance_labels.iter().cloned().collect(),
                        source_rows: event.rows,
                        outcome: result.outcome,
                    });
                }
                Err(e) => {
                    // One bad event write never aborts the batch.
                    summary.failed += 1;
                    error!("Failed to upsert {}: {}", event.title(), e);
                    println!("❌ Failed to upsert {}: {}", event.title(), e);
                }
            }
        }

        if options.dry_run {
            for line in &previews {
                println!("{line}");
            }
            println!("⚠️  Dry run completed. No records were written.");
            return Ok(summary);
        }

        println!("✅ Created {} events.", summary.created);
        if summary.updated > 0 {
            println!("✅ Updated {} events.", summary.updated);
        }

        if let Some(report_dir) = &options.report_dir {
            let report_file = self.write_report(&summary, report_dir)?;
            info!("Wrote run report to {}", report_file);
            println!("💾 Run report: {report_file}");
        }

        Ok(summary)
    }

    /// Stream the CSV and fold rows into aggregated events. Malformed and
    /// unparseable rows are skipped silently.
    fn read_and_aggregate(
        &self,
        options: &ImportOptions,
    ) -> Result<(Vec<AggregatedEvent>, usize, usize)> {
        let mut reader = csv::Reader::from_path(&options.csv_path)?;
        let mut aggregator = Aggregator::with_limit(options.limit);
        let mut total_rows = 0usize;
        let mut parsed_rows = 0usize;

        for result in reader.deserialize::<RawRow>() {
            total_rows += 1;
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("Skipping malformed CSV record {}: {}", total_rows, e);
                    continue;
                }
            };

            let Some(fact) = normalize_row(&row) else {
                debug!("Skipping unparseable row {}", total_rows);
                continue;
            };
            parsed_rows += 1;

            aggregator.add(&fact);
        }

        Ok((aggregator.into_events(), total_rows, parsed_rows))
    }

    /// Create or update one event (and any same-title duplicates) together
    /// with its category links.
    #[instrument(skip(self, event, schedule, resolver), fields(title = %event.title()))]
    async fn upsert_event(
        &self,
        event: &AggregatedEvent,
        schedule: &DerivedSchedule,
        resolver: &mut CategoryResolver,
    ) -> Result<UpsertResult> {
        let args = EventArgs {
            description: event.build_description(schedule),
            city: event.city().to_string(),
            country: event.country.clone(),
            venue: event.venue().to_string(),
            start_date: schedule.start_date,
            end_date: schedule.end_date,
            registration_open_date: schedule.registration_open_date,
            registration_deadline: schedule.registration_deadline,
            status: schedule.status,
            popularity_score: event.finishers,
            participant_limit: event.finishers,
            registered_count: event.finishers,
            featured: false,
            banner_image: String::new(),
        };

        let categories = resolver
            .resolve(&event.distance_labels, self.storage.as_ref())
            .await?;
        let category_ids: Vec<Uuid> = categories.iter().filter_map(|c| c.id).collect();

        let existing = self.storage.get_events_by_title(&event.title()).await?;
        let Some((canonical, duplicates)) = existing.split_first() else {
            let mut new_event = Event::new(event.title(), args);
            self.storage.create_event(&mut new_event).await?;
            let event_id = stored_id(&new_event)?;
            self.storage
                .set_event_categories(event_id, &category_ids)
                .await?;

            info!("Created event: {}", new_event.title);
            return Ok(UpsertResult {
                outcome: UpsertOutcome::Created,
                duplicate_updates: 0,
            });
        };

        let mut canonical = canonical.clone();
        canonical.apply(&args);
        self.storage.update_event(&canonical).await?;
        self.storage
            .set_event_categories(stored_id(&canonical)?, &category_ids)
            .await?;

        // Older imports keyed on title too, so stray duplicates get the
        // same data rather than drifting.
        let mut duplicate_updates = 0;
        for duplicate in duplicates {
            let mut duplicate = duplicate.clone();
            duplicate.apply(&args);
            self.storage.update_event(&duplicate).await?;
            self.storage
                .set_event_categories(stored_id(&duplicate)?, &category_ids)
                .await?;
            duplicate_updates += 1;
        }

        info!("Updated event: {}", canonical.title);
        Ok(UpsertResult {
            outcome: UpsertOutcome::Updated,
            duplicate_updates,
        })
    }

    /// Persist the run summary as a timestamped JSON report.
    fn write_report(&self, summary: &ImportSummary, report_dir: &Path) -> Result<String> {
        fs::create_dir_all(report_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("import_{timestamp}.json");
        let filepath = report_dir.join(&filename);

        let json_content = serde_json::to_string_pretty(summary)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}

fn stored_id(event: &Event) -> Result<Uuid> {
    event.id.ok_or_else(|| ImportError::Storage {
        message: format!("Event '{}' has no ID", event.title),
    })
}
