//! Posology tier selection.
//!
//! A medicine carries several tiers qualified by minimum age and/or minimum
//! weight. Tiers are ranked most demanding first (oldest minimum age, then
//! heaviest minimum weight) and the first one the person qualifies for wins.

use crate::{MedicineCfg, Person, PosologyEntry, PosologyError};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Rank two tiers: higher minimum age first, then higher minimum weight
fn most_demanding_first(a: &PosologyEntry, b: &PosologyEntry) -> Ordering {
    b.min_age
        .cmp(&a.min_age)
        .then_with(|| b.min_weight_kg.total_cmp(&a.min_weight_kg))
}

/// Return the tiers ranked most demanding first, leaving the input untouched
pub fn ordered_tiers(tiers: &[PosologyEntry]) -> Vec<&PosologyEntry> {
    let mut ordered: Vec<_> = tiers.iter().collect();
    ordered.sort_by(|a, b| most_demanding_first(a, b));
    ordered
}

/// Whether `person` qualifies for `entry` at `now`
///
/// Age OR weight is enough. A tier with no weight threshold can only be
/// reached through age.
pub fn qualifies(person: &Person, entry: &PosologyEntry, now: DateTime<Utc>) -> bool {
    let old_enough = person.age_at(now) >= entry.min_age;
    let heavy_enough = entry.min_weight_kg > 0.0 && person.weight_kg >= entry.min_weight_kg;
    old_enough || heavy_enough
}

/// Select the applicable tier of `medicine` for `person` at `now`
pub fn select_posology(
    person: &Person,
    medicine: &MedicineCfg,
    now: DateTime<Utc>,
) -> std::result::Result<PosologyEntry, PosologyError> {
    let selected = ordered_tiers(&medicine.posology)
        .into_iter()
        .find(|entry| qualifies(person, entry, now))
        .cloned();

    match selected {
        Some(entry) => {
            tracing::debug!(
                "Selected tier for {}: min_age={}d min_weight={}kg",
                person.name,
                entry.min_age.num_days(),
                entry.min_weight_kg
            );
            Ok(entry)
        }
        None => Err(PosologyError::TooYoung),
    }
}
