//! Point-in-time view of people, medicines and dose history.
//!
//! A snapshot is assembled fresh for each evaluation and only ever read.
//! It does not assume referential integrity: doses may mention people or
//! medicines it does not know, and lookups report them as not found.

use crate::engine::{evaluate, Decision};
use crate::history::DoseHistory;
use crate::posology::select_posology;
use crate::{MedicineCfg, MedicineName, Person, PersonName, PosologyEntry, PosologyError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub people: Vec<Person>,
    pub medicines: HashMap<MedicineName, MedicineCfg>,
    pub doses: DoseHistory,
}

impl Snapshot {
    pub fn has_medicine(&self, medicine: &MedicineName) -> bool {
        self.medicines.contains_key(medicine)
    }

    pub fn has_person(&self, person: &PersonName) -> bool {
        self.person(person).is_some()
    }

    pub fn person(&self, name: &PersonName) -> Option<&Person> {
        self.people.iter().find(|p| &p.name == name)
    }

    /// Medicine names in alphabetical order
    pub fn medicine_names(&self) -> Vec<&MedicineName> {
        let mut names: Vec<_> = self.medicines.keys().collect();
        names.sort();
        names
    }

    /// Dose timestamps for the pair, most recent first
    pub fn history_for(&self, person: &PersonName, medicine: &MedicineName) -> &[DateTime<Utc>] {
        self.doses.history_for(person, medicine)
    }

    /// Posology applying to `person` for `medicine` right now
    pub fn get_posology(
        &self,
        person: &PersonName,
        medicine: &MedicineName,
    ) -> std::result::Result<PosologyEntry, PosologyError> {
        self.get_posology_at(person, medicine, Utc::now())
    }

    /// Posology applying to `person` for `medicine` at `now`
    pub fn get_posology_at(
        &self,
        person: &PersonName,
        medicine: &MedicineName,
        now: DateTime<Utc>,
    ) -> std::result::Result<PosologyEntry, PosologyError> {
        let medicine = self
            .medicines
            .get(medicine)
            .ok_or(PosologyError::MedicineNotFound)?;
        let person = self.person(person).ok_or(PosologyError::PersonNotFound)?;

        select_posology(person, medicine, now)
    }

    /// Whether `person` may take `medicine` right now
    pub fn can_take(&self, person: &PersonName, medicine: &MedicineName) -> Decision {
        self.can_take_at(person, medicine, Utc::now())
    }

    /// Whether `person` may take `medicine` at `now`
    pub fn can_take_at(
        &self,
        person: &PersonName,
        medicine: &MedicineName,
        now: DateTime<Utc>,
    ) -> Decision {
        let posology = self.get_posology_at(person, medicine, now);
        let decision = evaluate(posology, self.history_for(person, medicine), now);

        tracing::info!(
            "{} / {}: allowed={} ({})",
            person,
            medicine,
            decision.allowed,
            decision.reason
        );

        decision
    }
}
