//! Rollup of the dose log into the CSV archive.
//!
//! The CSV is appended and fsynced before the log is renamed, so a crash in
//! between leaves duplicates (dropped on load by id) rather than gaps.

use crate::history::DoseRow;
use crate::Result;
use std::fs::OpenOptions;
use std::path::Path;

/// Move every logged dose into the CSV archive and archive the log
///
/// Returns the number of doses written. The log is renamed to
/// `<name>.processed` rather than deleted.
pub fn log_to_csv_and_archive(log_path: &Path, csv_path: &Path) -> Result<usize> {
    let events = crate::wal::read_doses(log_path)?;

    if events.is_empty() {
        tracing::info!("No doses in log to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for event in &events {
        writer.serialize(DoseRow::from(event))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    file.sync_all()?;

    tracing::info!("Wrote {} doses to CSV", events.len());

    let processed_path = processed_path(log_path);
    std::fs::rename(log_path, &processed_path)?;

    tracing::info!("Archived dose log to {:?}", processed_path);

    Ok(events.len())
}

fn processed_path(log_path: &Path) -> std::path::PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(".processed");
    name.into()
}

/// Remove archived `.processed` logs from `dir`
pub fn cleanup_processed_logs(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed log: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed dose logs", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{DoseSink, JsonlDoseLog};
    use crate::DoseEvent;
    use chrono::Utc;
    use std::fs::File;

    fn create_test_dose(person: &str) -> DoseEvent {
        DoseEvent::new(person.into(), "Aspirin".into(), Utc::now())
    }

    #[test]
    fn test_rollup_creates_csv_and_archives_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("doses.wal");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut log = JsonlDoseLog::new(&log_path);
        for name in ["Ann", "Bob", "Cid"] {
            log.append(&create_test_dose(name)).unwrap();
        }

        let count = log_to_csv_and_archive(&log_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!log_path.exists());
        assert!(temp_dir.path().join("doses.wal.processed").exists());
    }

    #[test]
    fn test_rollup_appends() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("doses.wal");
        let csv_path = temp_dir.path().join("doses.csv");

        JsonlDoseLog::new(&log_path)
            .append(&create_test_dose("Ann"))
            .unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        JsonlDoseLog::new(&log_path)
            .append(&create_test_dose("Bob"))
            .unwrap();
        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("doses.csv");

        File::create(&log_path).unwrap();

        assert_eq!(log_to_csv_and_archive(&log_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_logs() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("a.wal.processed")).unwrap();
        File::create(temp_dir.path().join("b.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        assert_eq!(cleanup_processed_logs(temp_dir.path()).unwrap(), 2);
        assert!(!temp_dir.path().join("a.wal.processed").exists());
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
