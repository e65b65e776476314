#![forbid(unsafe_code)]

//! Core domain model and dosing rules for medcheck.
//!
//! This crate provides:
//! - Domain types (people, medicines, posology tiers, dose events)
//! - Posology selection and the eligibility engine
//! - Snapshots of the record store
//! - Persistence (dose log, CSV tables, rollup)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod wal;
pub mod csv_rollup;
pub mod history;
pub mod posology;
pub mod engine;
pub mod snapshot;
pub mod store;

// Re-export commonly used types
pub use error::{Error, PosologyError, Result};
pub use types::*;
pub use config::Config;
pub use wal::{DoseSink, JsonlDoseLog};
pub use history::DoseHistory;
pub use posology::select_posology;
pub use engine::{Decision, Reason};
pub use snapshot::Snapshot;
pub use store::Store;
