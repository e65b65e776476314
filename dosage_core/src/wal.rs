//! Dose intake log.
//!
//! Dose events are appended to a JSONL (JSON Lines) file with file locking
//! so several `medcheck take` invocations can record safely.
//!
//! Every entry ends with a newline. The only damage tolerated is an
//! unterminated last line, which is what an interrupted append leaves behind.
//! Any other unreadable entry fails the read: skipping it would hide a dose.

use crate::{DoseEvent, Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Destination for newly recorded dose events
pub trait DoseSink {
    fn append(&mut self, event: &DoseEvent) -> Result<()>;
}

/// JSONL-based dose log with file locking
pub struct JsonlDoseLog {
    path: PathBuf,
}

impl JsonlDoseLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Make sure the log ends on a line boundary before appending
    ///
    /// A complete entry that only lacks its newline is terminated and kept.
    /// A partial entry is cut off.
    fn repair_tail(&self, file: &mut File) -> Result<()> {
        let content = read_all(file)?;
        if content.is_empty() || content.ends_with(b"\n") {
            return Ok(());
        }

        let keep = content
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let tail = String::from_utf8_lossy(&content[keep..]);

        if serde_json::from_str::<DoseEvent>(tail.trim()).is_ok() {
            tracing::warn!("{}: terminating unfinished dose entry", self.path.display());
            file.seek(SeekFrom::End(0))?;
            file.write_all(b"\n")?;
        } else {
            tracing::warn!(
                "{}: dropping torn dose entry ({} bytes)",
                self.path.display(),
                content.len() - keep
            );
            file.set_len(keep as u64)?;
        }
        Ok(())
    }

    fn write_entry(&self, file: &mut File, event: &DoseEvent) -> Result<()> {
        self.repair_tail(file)?;

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        file.seek(SeekFrom::End(0))?;
        file.write_all(&line)?;
        file.flush()?;
        Ok(())
    }
}

impl DoseSink for JsonlDoseLog {
    fn append(&mut self, event: &DoseEvent) -> Result<()> {
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.path)?;

        file.lock_exclusive()?;
        let written = self.write_entry(&mut file, event);
        file.unlock()?;
        written?;

        tracing::debug!(
            "Appended dose {} ({} / {}) to log",
            event.id,
            event.person,
            event.medicine
        );
        Ok(())
    }
}

fn read_all(file: &mut File) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut content)?;
    Ok(content)
}

/// Read all dose events from a log file
pub fn read_doses(path: &Path) -> Result<Vec<DoseEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut file = File::open(path)?;
    file.lock_shared()?;
    let content = read_all(&mut file);
    file.unlock()?;

    let events = parse_entries(path, &content?)?;
    tracing::debug!("Read {} doses from log", events.len());
    Ok(events)
}

fn parse_entries(path: &Path, content: &[u8]) -> Result<Vec<DoseEvent>> {
    // Lossy so a torn multi-byte name still reaches the tail check
    let text = String::from_utf8_lossy(content);
    let terminated = text.ends_with('\n');
    let lines: Vec<&str> = text.lines().collect();

    let mut events = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DoseEvent>(line) {
            Ok(event) => events.push(event),
            Err(e) if !terminated && index + 1 == lines.len() => {
                tracing::warn!(
                    "{}: ignoring torn dose entry at line {}: {}",
                    path.display(),
                    index + 1,
                    e
                );
            }
            Err(e) => {
                return Err(Error::Store(format!(
                    "{}: line {}: {}",
                    path.display(),
                    index + 1,
                    e
                )));
            }
        }
    }

    Ok(events)
}
