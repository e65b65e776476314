//! Core domain types for the dosing system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Person and medicine identities
//! - People and their biometric profile
//! - Posology tiers and medicine configuration
//! - Recorded dose events

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identities
// ============================================================================

/// Name identifying a person within a snapshot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonName(String);

impl PersonName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for PersonName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PersonName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Name identifying a medicine within a snapshot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicineName(String);

impl MedicineName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MedicineName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for MedicineName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for MedicineName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ============================================================================
// People
// ============================================================================

/// A person whose doses are tracked
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: PersonName,
    pub birth: DateTime<Utc>,
    pub weight_kg: f64,
    pub photo_url: Option<String>,
}

impl Person {
    /// Time elapsed since birth at `now`
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.birth
    }
}

// ============================================================================
// Posology
// ============================================================================

/// One eligibility tier of a medicine's dosing table
#[derive(Clone, Debug, PartialEq)]
pub struct PosologyEntry {
    /// Minimum time since birth for the tier to apply
    pub min_age: Duration,
    /// Minimum weight in kg; zero disables the weight criterion
    pub min_weight_kg: f64,
    /// Human description of the dose (e.g. "5 ml")
    pub quantity: String,
    /// Minimum delay between two consecutive doses
    pub dose_interval: Duration,
    /// Cap on doses within `max_doses_interval`; zero means uncapped
    pub max_doses: u32,
    /// Length of the rolling window the cap applies to
    pub max_doses_interval: Duration,
}

impl Default for PosologyEntry {
    fn default() -> Self {
        Self {
            min_age: Duration::zero(),
            min_weight_kg: 0.0,
            quantity: String::new(),
            dose_interval: Duration::zero(),
            max_doses: 0,
            max_doses_interval: Duration::zero(),
        }
    }
}

/// A medicine's configuration: its posology tiers, in storage order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MedicineCfg {
    pub posology: Vec<PosologyEntry>,
}

// ============================================================================
// Dose events
// ============================================================================

/// A recorded dose intake
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoseEvent {
    pub id: Uuid,
    pub person: PersonName,
    pub medicine: MedicineName,
    pub taken_at: DateTime<Utc>,
}

impl DoseEvent {
    /// Create a new event with a fresh id
    pub fn new(person: PersonName, medicine: MedicineName, taken_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            person,
            medicine,
            taken_at,
        }
    }
}
