use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::tempdir;

use marathon_importer::error::ImportError;
use marathon_importer::pipeline::{ImportOptions, ImportPipeline};
use marathon_importer::schedule::classify_status;
use marathon_importer::storage::{InMemoryStorage, Storage};

const CSV_HEADER: &str =
    "Year of event,Event name,Event dates,Event number of finishers,Event distance/length\n";

fn write_csv(dir: &std::path::Path, rows: &[&str]) -> PathBuf {
    let path = dir.join("races.csv");
    let mut content = CSV_HEADER.to_string();
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    fs::write(&path, content).unwrap();
    path
}

fn options(csv_path: PathBuf) -> ImportOptions {
    let mut options = ImportOptions::new(csv_path);
    options.today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    options
}

#[tokio::test]
async fn test_import_merges_rows_and_links_categories() -> Result<()> {
    let temp_dir = tempdir()?;
    let csv_path = write_csv(
        temp_dir.path(),
        &[
            "2018,Winter Classic (SWE),06.01.2018,100,21km",
            "2018,Winter Classic (SWE),06.01.2018,150,42km",
            "not-a-year,Broken Row,06.01.2018,5,10km",
        ],
    );

    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage.clone());
    let summary = pipeline.run(&options(csv_path)).await?;

    assert_eq!(summary.total_rows, 3);
    assert_eq!(summary.parsed_rows, 2);
    assert_eq!(summary.unique_events, 1);
    assert_eq!(summary.created, 1);
    assert_eq!(summary.updated, 0);
    assert_eq!(summary.failed, 0);

    let events = storage.get_events_by_title("Winter Classic 2018").await?;
    assert_eq!(events.len(), 1);
    let event = &events[0];

    // Max finishers across rows seed the participation figures.
    assert_eq!(event.registered_count, 150);
    assert_eq!(event.participant_limit, 150);
    assert_eq!(event.popularity_score, 150);
    assert_eq!(event.city, "Winter Classic");
    assert_eq!(event.country, "Sweden");

    // Both distance labels resolve to linked categories.
    assert_eq!(event.category_ids.len(), 2);
    let half = storage.get_category_by_label("21km").await?.unwrap();
    let full = storage.get_category_by_label("42km").await?.unwrap();
    assert_eq!(half.distance_km, Decimal::new(21, 0));
    assert_eq!(full.distance_km, Decimal::new(42, 0));
    assert!(event.category_ids.contains(&half.id.unwrap()));
    assert!(event.category_ids.contains(&full.id.unwrap()));

    // Schedule invariants and status classification.
    assert!(event.registration_deadline < event.start_date);
    assert!(event.registration_open_date < event.registration_deadline);
    let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    assert_eq!(event.status, classify_status(event.start_date, event.end_date, today));

    // The description references the distances and the finisher count.
    assert!(event.description.contains("21km and 42km"));
    assert!(event.description.contains("150 recorded finishers"));

    Ok(())
}

#[tokio::test]
async fn test_reimport_updates_instead_of_duplicating() -> Result<()> {
    let temp_dir = tempdir()?;
    let csv_path = write_csv(
        temp_dir.path(),
        &["2018,Winter Classic (SWE),06.01.2018,100,21km"],
    );

    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage.clone());

    let first = pipeline.run(&options(csv_path.clone())).await?;
    assert_eq!(first.created, 1);
    let first_event = storage
        .get_events_by_title("Winter Classic 2018")
        .await?
        .remove(0);

    let second = pipeline.run(&options(csv_path)).await?;
    assert_eq!(second.created, 0);
    assert_eq!(second.updated, 1);

    let events = storage.get_events_by_title("Winter Classic 2018").await?;
    assert_eq!(events.len(), 1);
    // Same identity and same day means the derived schedule reproduces.
    assert_eq!(events[0].start_date, first_event.start_date);
    assert_eq!(events[0].registration_deadline, first_event.registration_deadline);

    Ok(())
}

#[tokio::test]
async fn test_dry_run_writes_nothing() -> Result<()> {
    let temp_dir = tempdir()?;
    let csv_path = write_csv(
        temp_dir.path(),
        &["2018,Winter Classic (SWE),06.01.2018,100,21km"],
    );

    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage.clone());

    let mut opts = options(csv_path);
    opts.dry_run = true;
    let summary = pipeline.run(&opts).await?;

    assert_eq!(summary.unique_events, 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 0);
    assert!(storage.get_events_by_title("Winter Classic 2018").await?.is_empty());
    assert!(storage.get_category_by_label("21km").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_limit_caps_distinct_events() -> Result<()> {
    let temp_dir = tempdir()?;
    let csv_path = write_csv(
        temp_dir.path(),
        &[
            "2018,Winter Classic (SWE),06.01.2018,100,21km",
            "2018,Desert Dash (ESP),12.05.2018,40,100km",
            "2018,Winter Classic (SWE),06.01.2018,120,42km",
        ],
    );

    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage.clone());

    let mut opts = options(csv_path);
    opts.limit = Some(1);
    let summary = pipeline.run(&opts).await?;

    assert_eq!(summary.unique_events, 1);
    assert_eq!(summary.created, 1);
    let event = storage
        .get_events_by_title("Winter Classic 2018")
        .await?
        .remove(0);
    // Rows for the admitted event still merged after the cap was hit.
    assert_eq!(event.registered_count, 120);
    assert_eq!(event.category_ids.len(), 2);
    assert!(storage.get_events_by_title("Desert Dash 2018").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_missing_csv_is_fatal() {
    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage);

    let result = pipeline
        .run(&options(PathBuf::from("/nonexistent/races.csv")))
        .await;
    assert!(matches!(result, Err(ImportError::CsvNotFound(_))));
}

#[tokio::test]
async fn test_run_report_is_written() -> Result<()> {
    let temp_dir = tempdir()?;
    let csv_path = write_csv(
        temp_dir.path(),
        &["2018,Winter Classic (SWE),06.01.2018,100,21km"],
    );

    let storage = Arc::new(InMemoryStorage::new());
    let pipeline = ImportPipeline::new(storage);

    let report_dir = temp_dir.path().join("reports");
    let mut opts = options(csv_path);
    opts.report_dir = Some(report_dir.clone());
    pipeline.run(&opts).await?;

    let reports: Vec<_> = fs::read_dir(&report_dir)?.collect();
    assert_eq!(reports.len(), 1);
    let content = fs::read_to_string(reports[0].as_ref().unwrap().path())?;
    let report: serde_json::Value = serde_json::from_str(&content)?;
    assert_eq!(report["created"], 1);
    assert_eq!(report["outcomes"][0]["title"], "Winter Classic 2018");
    assert_eq!(report["outcomes"][0]["outcome"], "created");

    Ok(())
}
