//! Error types for the dosage_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dosage_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backing store could not be read or contained invalid records
    #[error("Store error: {0}")]
    Store(String),

    /// No posology applies to the requested person/medicine pair
    #[error(transparent)]
    Posology(#[from] PosologyError),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Reasons a posology cannot be selected for a person/medicine pair.
///
/// The display text doubles as the user-facing reason of a denied decision,
/// so it must stay stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PosologyError {
    #[error("<error: medicine not found>")]
    MedicineNotFound,

    #[error("<error: person not found>")]
    PersonNotFound,

    /// The person qualifies for none of the medicine's tiers
    #[error("they are too young")]
    TooYoung,
}
