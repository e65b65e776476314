//! Eligibility engine deciding whether a dose may be taken now.
//!
//! Decision procedure, given the selected tier and the pair's history:
//!
//! 1. **No history**: allowed.
//! 2. **Recency**: if the rolling window holds any dose and the last dose is
//!    no older than `dose_interval`, denied until the interval has elapsed.
//! 3. **Frequency**: if the window holds `max_doses` doses or more, denied
//!    until the oldest of the counted doses leaves the window.
//!
//! Checks 2 and 3 compose: when both trip, the longer wait is reported.

use crate::{PosologyEntry, PosologyError};
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Why a decision came out the way it did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reason {
    /// No posology could be selected
    Ineligible(PosologyError),
    NeverDosed,
    LastDoseTooRecent,
    TooManyDoses,
    NotRecentlyDosed,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Ineligible(err) => write!(f, "{}", err),
            Reason::NeverDosed => f.write_str("they never had a dose"),
            Reason::LastDoseTooRecent => f.write_str("their last dose is too recent"),
            Reason::TooManyDoses => f.write_str("they had too many doses recently"),
            Reason::NotRecentlyDosed => f.write_str("they haven't had a dose in a while"),
        }
    }
}

/// Outcome of an eligibility check
#[derive(Clone, Debug, PartialEq)]
pub struct Decision {
    pub allowed: bool,
    pub reason: Reason,
    /// Selected tier; zero-valued when `reason` is `Ineligible`
    pub posology: PosologyEntry,
    /// Minimum wait before the next dose; zero when allowed
    pub wait_for: Duration,
}

impl Decision {
    fn allow(reason: Reason, posology: PosologyEntry) -> Self {
        Self {
            allowed: true,
            reason,
            posology,
            wait_for: Duration::zero(),
        }
    }

    /// Denied, but the remaining wait is under a tenth of the interval
    /// that caused the denial
    ///
    /// Never true for allowed or ineligible decisions.
    pub fn nearly_allowed(&self) -> bool {
        let interval = match self.reason {
            Reason::LastDoseTooRecent => self.posology.dose_interval,
            Reason::TooManyDoses => self.posology.max_doses_interval,
            _ => return false,
        };
        !self.allowed && self.wait_for * 10 < interval
    }

    fn ineligible(err: PosologyError) -> Self {
        Self {
            allowed: false,
            reason: Reason::Ineligible(err),
            posology: PosologyEntry::default(),
            wait_for: Duration::zero(),
        }
    }
}

/// Decide eligibility from a posology selection and the pair's history
///
/// `history` must be ordered most recent first.
pub fn evaluate(
    posology: std::result::Result<PosologyEntry, PosologyError>,
    history: &[DateTime<Utc>],
    now: DateTime<Utc>,
) -> Decision {
    let posology = match posology {
        Ok(entry) => entry,
        Err(err) => return Decision::ineligible(err),
    };

    let Some(&last_dose) = history.first() else {
        return Decision::allow(Reason::NeverDosed, posology);
    };

    let window: Vec<DateTime<Utc>> = history
        .iter()
        .copied()
        .filter(|&dose| now - dose < posology.max_doses_interval)
        .collect();

    let since_last = now - last_dose;
    let recency_wait = if !window.is_empty() && since_last <= posology.dose_interval {
        Some(posology.dose_interval - since_last)
    } else {
        None
    };

    // A zero cap means the tier has no frequency limit
    let max_doses = posology.max_doses as usize;
    let frequency_wait = if max_doses > 0 && window.len() >= max_doses {
        let oldest_counted = window[max_doses - 1];
        Some(posology.max_doses_interval - (now - oldest_counted))
    } else {
        None
    };

    let mut decision = Decision::allow(Reason::NotRecentlyDosed, posology);

    if let Some(wait) = recency_wait {
        tracing::debug!(
            "Last dose {} min ago is within the {} min interval",
            since_last.num_minutes(),
            decision.posology.dose_interval.num_minutes()
        );
        decision.allowed = false;
        decision.reason = Reason::LastDoseTooRecent;
        decision.wait_for = wait;
    }

    if let Some(wait) = frequency_wait {
        tracing::debug!(
            "{} doses in the last {} h (cap {})",
            window.len(),
            decision.posology.max_doses_interval.num_hours(),
            max_doses
        );
        decision.allowed = false;
        decision.reason = Reason::TooManyDoses;
        decision.wait_for = decision.wait_for.max(wait);
    }

    decision.wait_for = decision.wait_for.max(Duration::zero());
    decision
}
