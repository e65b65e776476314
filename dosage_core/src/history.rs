//! Dose history loading and indexing.
//!
//! Dose events are read from both the dose log and the CSV archive, then
//! grouped per person and medicine, most recent first.

use crate::{DoseEvent, MedicineName, PersonName, Result};
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// CSV row format for archived dose events
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DoseRow {
    pub id: String,
    pub person: String,
    pub medicine: String,
    pub taken_at: String,
}

impl From<&DoseEvent> for DoseRow {
    fn from(event: &DoseEvent) -> Self {
        DoseRow {
            id: event.id.to_string(),
            person: event.person.to_string(),
            medicine: event.medicine.to_string(),
            taken_at: event.taken_at.to_rfc3339(),
        }
    }
}

impl TryFrom<DoseRow> for DoseEvent {
    type Error = crate::Error;

    fn try_from(row: DoseRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| crate::Error::Other(format!("Invalid UUID: {}", e)))?;

        let taken_at = DateTime::parse_from_rfc3339(&row.taken_at)
            .map_err(|e| crate::Error::Other(format!("Invalid date: {}", e)))?
            .with_timezone(&Utc);

        Ok(DoseEvent {
            id,
            person: row.person.into(),
            medicine: row.medicine.into(),
            taken_at,
        })
    }
}

/// Per person and medicine dose timestamps, most recent first
#[derive(Clone, Debug, Default)]
pub struct DoseHistory {
    doses: HashMap<PersonName, HashMap<MedicineName, Vec<DateTime<Utc>>>>,
}

impl DoseHistory {
    /// Group raw events by person and medicine
    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = DoseEvent>,
    {
        let mut doses: HashMap<PersonName, HashMap<MedicineName, Vec<DateTime<Utc>>>> =
            HashMap::new();

        for event in events {
            doses
                .entry(event.person)
                .or_default()
                .entry(event.medicine)
                .or_default()
                .push(event.taken_at);
        }

        for per_medicine in doses.values_mut() {
            for timestamps in per_medicine.values_mut() {
                timestamps.sort_by(|a, b| b.cmp(a));
            }
        }

        Self { doses }
    }

    /// Timestamps of every dose `person` took of `medicine`, newest first
    ///
    /// Empty when the pair was never dosed.
    pub fn history_for(&self, person: &PersonName, medicine: &MedicineName) -> &[DateTime<Utc>] {
        self.doses
            .get(person)
            .and_then(|per_medicine| per_medicine.get(medicine))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of recorded doses
    pub fn len(&self) -> usize {
        self.doses
            .values()
            .flat_map(HashMap::values)
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Load every dose event from the dose log and the CSV archive
///
/// Events present in both (same id) are only returned once.
pub fn load_dose_events(log_path: &Path, csv_path: &Path) -> Result<Vec<DoseEvent>> {
    let mut events = Vec::new();
    let mut seen_ids = HashSet::new();

    // Load from the dose log first (most recent)
    if log_path.exists() {
        for event in crate::wal::read_doses(log_path)? {
            if seen_ids.insert(event.id) {
                events.push(event);
            }
        }
        tracing::debug!("Loaded {} doses from dose log", events.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for event in load_doses_from_csv(csv_path)? {
            if seen_ids.insert(event.id) {
                events.push(event);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} doses from CSV", csv_count);
    }

    tracing::info!("Loaded {} dose events", events.len());
    Ok(events)
}

/// Load all dose events from a CSV archive
///
/// Any malformed row fails the load: a dropped row would hide a dose.
fn load_doses_from_csv(path: &Path) -> Result<Vec<DoseEvent>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut events = Vec::new();
    for (index, result) in reader.deserialize::<DoseRow>().enumerate() {
        let event = result
            .map_err(crate::Error::from)
            .and_then(DoseEvent::try_from)
            .map_err(|e| {
                // Row 1 is the header
                crate::Error::Store(format!("{}: row {}: {}", path.display(), index + 2, e))
            })?;
        events.push(event);
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::{DoseSink, JsonlDoseLog};
    use chrono::Duration;

    fn dose(person: &str, medicine: &str, hours_ago: i64) -> DoseEvent {
        DoseEvent::new(
            person.into(),
            medicine.into(),
            Utc::now() - Duration::hours(hours_ago),
        )
    }

    #[test]
    fn test_history_is_newest_first() {
        let old = dose("John", "Aspirin", 30);
        let mid = dose("John", "Aspirin", 10);
        let new = dose("John", "Aspirin", 1);
        let expected = vec![new.taken_at, mid.taken_at, old.taken_at];

        let history = DoseHistory::from_events(vec![mid, old, new]);

        assert_eq!(
            history.history_for(&"John".into(), &"Aspirin".into()),
            expected.as_slice()
        );
    }

    #[test]
    fn test_history_groups_by_pair() {
        let history = DoseHistory::from_events(vec![
            dose("John", "Aspirin", 1),
            dose("John", "Ibuprofen", 2),
            dose("Jane", "Aspirin", 3),
            dose("Jane", "Aspirin", 4),
        ]);

        assert_eq!(history.history_for(&"John".into(), &"Aspirin".into()).len(), 1);
        assert_eq!(history.history_for(&"John".into(), &"Ibuprofen".into()).len(), 1);
        assert_eq!(history.history_for(&"Jane".into(), &"Aspirin".into()).len(), 2);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_never_dosed_is_empty() {
        let history = DoseHistory::from_events(vec![dose("John", "Aspirin", 1)]);
        assert!(history.history_for(&"Jane".into(), &"Aspirin".into()).is_empty());
        assert!(history.history_for(&"John".into(), &"Ibuprofen".into()).is_empty());
        assert!(DoseHistory::default().is_empty());
    }

    #[test]
    fn test_load_dose_events_from_log() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("doses.wal");
        let csv_path = temp_dir.path().join("doses.csv");

        let mut log = JsonlDoseLog::new(&log_path);
        log.append(&dose("John", "Aspirin", 1)).unwrap();
        log.append(&dose("John", "Aspirin", 5)).unwrap();

        let events = load_dose_events(&log_path, &csv_path).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_deduplication_across_log_and_csv() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("doses.wal");
        let csv_path = temp_dir.path().join("doses.csv");

        let event = dose("John", "Aspirin", 1);
        let mut log = JsonlDoseLog::new(&log_path);
        log.append(&event).unwrap();
        crate::csv_rollup::log_to_csv_and_archive(&log_path, &csv_path).unwrap();

        // Same event lands in the log again, as after an interrupted rollup
        let mut log = JsonlDoseLog::new(&log_path);
        log.append(&event).unwrap();

        let events = load_dose_events(&log_path, &csv_path).unwrap();
        assert_eq!(events.iter().filter(|e| e.id == event.id).count(), 1);
    }

    #[test]
    fn test_malformed_csv_row_fails_the_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("doses.csv");
        let good = dose("Zaya", "ChildrenIbuprofen", 2);
        let one_hour_ago = (Utc::now() - Duration::hours(1)).format("%Y-%m-%d %H:%M:%S");

        std::fs::write(
            &csv_path,
            format!(
                "id,person,medicine,taken_at\n\
                 {},Zaya,ChildrenIbuprofen,{}\n\
                 {},Zaya,ChildrenIbuprofen,{}\n",
                good.id,
                good.taken_at.to_rfc3339(),
                Uuid::new_v4(),
                one_hour_ago
            ),
        )
        .unwrap();

        let err = load_dose_events(&temp_dir.path().join("missing.wal"), &csv_path).unwrap_err();
        assert!(matches!(err, crate::Error::Store(_)));
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_bad_uuid_in_csv_fails_the_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("doses.csv");

        std::fs::write(
            &csv_path,
            "id,person,medicine,taken_at\nnot-a-uuid,John,Aspirin,2024-01-01T00:00:00Z\n",
        )
        .unwrap();

        let err = load_dose_events(&temp_dir.path().join("missing.wal"), &csv_path).unwrap_err();
        assert!(err.to_string().contains("row 2"));
        assert!(err.to_string().contains("Invalid UUID"));
    }
}
