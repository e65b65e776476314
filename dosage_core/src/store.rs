//! File-backed record store.
//!
//! Three tables live under the data directory:
//! - `people.csv`: `name,birth,weight_kg,photo_url`
//! - `medicines.csv`: one posology tier per row,
//!   `medicine,min_age_days,min_weight_kg,quantity,dose_interval_hours,max_doses,max_doses_interval_hours`
//! - dose history, split between the append-only dose log and `doses.csv`
//!
//! Snapshots are assembled by loading the three tables in parallel.

use crate::config::{Config, StoreConfig};
use crate::history::{load_dose_events, DoseHistory};
use crate::wal::{DoseSink, JsonlDoseLog};
use crate::{
    DoseEvent, Error, MedicineCfg, MedicineName, Person, PersonName, PosologyEntry, Result,
    Snapshot,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::thread;

#[derive(Debug, Deserialize)]
struct PersonRow {
    name: String,
    birth: NaiveDate,
    weight_kg: f64,
    photo_url: Option<String>,
}

impl TryFrom<PersonRow> for Person {
    type Error = String;

    fn try_from(row: PersonRow) -> std::result::Result<Self, String> {
        let name = row.name.trim();
        if name.is_empty() {
            return Err("empty name".into());
        }
        if !row.weight_kg.is_finite() || row.weight_kg < 0.0 {
            return Err(format!("invalid weight {}", row.weight_kg));
        }
        let midnight = row
            .birth
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid birth date {}", row.birth))?;

        Ok(Person {
            name: PersonName::new(name),
            birth: Utc.from_utc_datetime(&midnight),
            weight_kg: row.weight_kg,
            photo_url: row.photo_url.filter(|url| !url.trim().is_empty()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MedicineRow {
    medicine: String,
    min_age_days: u32,
    min_weight_kg: Option<f64>,
    quantity: String,
    dose_interval_hours: u32,
    max_doses: u32,
    max_doses_interval_hours: u32,
}

impl MedicineRow {
    /// Split the row into the medicine it belongs to and the tier it describes
    fn into_tier(self) -> std::result::Result<(MedicineName, PosologyEntry), String> {
        let name = self.medicine.trim();
        if name.is_empty() {
            return Err("empty medicine name".into());
        }
        let min_weight_kg = self.min_weight_kg.unwrap_or(0.0);
        if !min_weight_kg.is_finite() || min_weight_kg < 0.0 {
            return Err(format!("invalid minimum weight {}", min_weight_kg));
        }

        let entry = PosologyEntry {
            min_age: Duration::days(i64::from(self.min_age_days)),
            min_weight_kg,
            quantity: self.quantity.clone(),
            dose_interval: Duration::hours(i64::from(self.dose_interval_hours)),
            max_doses: self.max_doses,
            max_doses_interval: Duration::hours(i64::from(self.max_doses_interval_hours)),
        };
        Ok((MedicineName::new(name), entry))
    }
}

/// Record store rooted at a data directory
#[derive(Clone, Debug)]
pub struct Store {
    data_dir: PathBuf,
    files: StoreConfig,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>, files: StoreConfig) -> Self {
        Self {
            data_dir: data_dir.into(),
            files,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data.data_dir.clone(), config.store.clone())
    }

    pub fn people_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.people_file)
    }

    pub fn medicines_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.medicines_file)
    }

    pub fn doses_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.doses_file)
    }

    pub fn dose_log_path(&self) -> PathBuf {
        self.data_dir.join(&self.files.dose_log_file)
    }

    /// Load every person, rejecting malformed rows and duplicate names
    pub fn load_people(&self) -> Result<Vec<Person>> {
        let path = self.people_path();
        let mut reader = open_table(&path)?;

        let mut people = Vec::new();
        let mut seen = HashSet::new();
        for (index, result) in reader.deserialize::<PersonRow>().enumerate() {
            let person = result
                .map_err(|e| row_error(&path, index, e))
                .and_then(|row| Person::try_from(row).map_err(|e| row_error(&path, index, e)))?;

            if !seen.insert(person.name.clone()) {
                return Err(row_error(&path, index, format!("duplicate person {}", person.name)));
            }
            people.push(person);
        }

        tracing::debug!("Loaded {} people from {:?}", people.len(), path);
        Ok(people)
    }

    /// Load every medicine, accumulating its tiers in file order
    pub fn load_medicines(&self) -> Result<HashMap<MedicineName, MedicineCfg>> {
        let path = self.medicines_path();
        let mut reader = open_table(&path)?;

        let mut medicines: HashMap<MedicineName, MedicineCfg> = HashMap::new();
        for (index, result) in reader.deserialize::<MedicineRow>().enumerate() {
            let (name, entry) = result
                .map_err(|e| row_error(&path, index, e))
                .and_then(|row| row.into_tier().map_err(|e| row_error(&path, index, e)))?;

            medicines.entry(name).or_default().posology.push(entry);
        }

        tracing::debug!("Loaded {} medicines from {:?}", medicines.len(), path);
        Ok(medicines)
    }

    /// Load the dose history from the dose log and the CSV archive
    pub fn load_doses(&self) -> Result<DoseHistory> {
        let events = load_dose_events(&self.dose_log_path(), &self.doses_path())?;
        Ok(DoseHistory::from_events(events))
    }

    /// Assemble a snapshot, loading the three tables concurrently
    ///
    /// Fails as a whole if any table fails to load.
    pub fn load_snapshot(&self) -> Result<Snapshot> {
        thread::scope(|scope| {
            let people = scope.spawn(|| self.load_people());
            let medicines = scope.spawn(|| self.load_medicines());
            let doses = scope.spawn(|| self.load_doses());

            let people = join_loader(people, "people")?;
            let medicines = join_loader(medicines, "medicines")?;
            let doses = join_loader(doses, "doses")?;

            Ok(Snapshot {
                people,
                medicines,
                doses,
            })
        })
    }

    /// Append a dose intake to the dose log
    pub fn record_dose(
        &self,
        person: PersonName,
        medicine: MedicineName,
        taken_at: DateTime<Utc>,
    ) -> Result<DoseEvent> {
        let event = DoseEvent::new(person, medicine, taken_at);
        JsonlDoseLog::new(self.dose_log_path()).append(&event)?;
        tracing::info!(
            "Recorded dose of {} for {} at {}",
            event.medicine,
            event.person,
            event.taken_at
        );
        Ok(event)
    }
}

fn open_table(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(Error::Store(format!("{} not found", path.display())));
    }
    Ok(ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?)
}

fn row_error(path: &Path, index: usize, cause: impl std::fmt::Display) -> Error {
    // Row 1 is the header
    Error::Store(format!("{}: row {}: {}", path.display(), index + 2, cause))
}

fn join_loader<T>(handle: thread::ScopedJoinHandle<'_, Result<T>>, table: &str) -> Result<T> {
    let loaded = handle
        .join()
        .map_err(|_| Error::Store(format!("{} loader panicked", table)))?;

    loaded.map_err(|e| {
        tracing::error!("Unable to retrieve {}: {}", table, e);
        e
    })
}
