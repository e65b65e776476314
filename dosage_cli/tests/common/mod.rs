//! Shared fixtures for the medcheck integration tests.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PEOPLE: &str = "\
name,birth,weight_kg,photo_url
Aline,1990-04-02,60,https://example.org/aline.jpg
Zaya,2021-06-15,14.5,
";

pub const MEDICINES: &str = "\
medicine,min_age_days,min_weight_kg,quantity,dose_interval_hours,max_doses,max_doses_interval_hours
ChildrenIbuprofen,730,,5 ml,6,4,24
ChildrenIbuprofen,1460,16,7.5 ml,6,4,24
AdultOnly,36500,,1 tablet,4,3,24
";

/// A data directory seeded with the people and medicine tables
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        fs::write(dir.path().join("people.csv"), PEOPLE).unwrap();
        fs::write(dir.path().join("medicines.csv"), MEDICINES).unwrap();
        // Empty config keeps the user's own configuration out of the tests
        fs::write(dir.path().join("config.toml"), "").unwrap();
        Self { dir }
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn dose_log(&self) -> PathBuf {
        self.data_dir().join("wal/doses.wal")
    }

    pub fn logged_doses(&self) -> usize {
        fs::read_to_string(self.dose_log())
            .map(|content| content.lines().count())
            .unwrap_or(0)
    }

    /// The CLI pointed at this environment
    pub fn cli(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medcheck"));
        cmd.arg("--config")
            .arg(self.data_dir().join("config.toml"))
            .arg("--data-dir")
            .arg(self.data_dir());
        cmd
    }
}
