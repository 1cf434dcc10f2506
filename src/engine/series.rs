use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::limits::MAX_REPEAT_DAYS;
use crate::model::Booking;

use super::conflict::ConflictVerdict;
use super::lifecycle::BookingDraft;
use super::EngineError;

/// What to do with dates whose verdict is blocking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Commit every clear date; report blocked ones as skipped.
    #[default]
    Skip,
    /// Commit nothing if any date is blocked.
    Abort,
    /// Commit every date; the verdicts travel with the result.
    Force,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(ConflictPolicy::Skip),
            "abort" => Ok(ConflictPolicy::Abort),
            "force" => Ok(ConflictPolicy::Force),
            other => Err(format!("unknown conflict policy {other:?}")),
        }
    }
}

/// `repeat_days + 1` copies of `base` on consecutive dates starting at `base.date`.
/// Only `date` differs between copies.
pub fn expand(base: &BookingDraft, repeat_days: u32) -> Result<Vec<BookingDraft>, EngineError> {
    if repeat_days > MAX_REPEAT_DAYS {
        return Err(EngineError::LimitExceeded("too many repeat days"));
    }
    (0..=repeat_days)
        .map(|offset| {
            let date = base
                .date
                .checked_add_days(Days::new(u64::from(offset)))
                .ok_or(EngineError::LimitExceeded("series runs past the last date"))?;
            Ok(BookingDraft {
                date,
                ..base.clone()
            })
        })
        .collect()
}

/// Which dates to commit, index-aligned with `verdicts`.
pub fn plan(policy: ConflictPolicy, verdicts: &[ConflictVerdict]) -> Vec<bool> {
    match policy {
        ConflictPolicy::Force => vec![true; verdicts.len()],
        ConflictPolicy::Skip => verdicts.iter().map(|v| !v.is_blocking()).collect(),
        ConflictPolicy::Abort => {
            let clear = !verdicts.iter().any(ConflictVerdict::is_blocking);
            vec![clear; verdicts.len()]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Disposition {
    Created { booking: Booking },
    /// Blocked under `skip`.
    Skipped,
    /// Not committed because another date of the series was blocked under `abort`.
    Aborted,
    /// The store refused the commit.
    Failed { kind: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDay {
    pub date: NaiveDate,
    pub verdict: ConflictVerdict,
    #[serde(flatten)]
    pub disposition: Disposition,
}

/// Per-date result of a create. Never silently drops a date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub days: Vec<SeriesDay>,
}

impl SeriesOutcome {
    pub fn created(&self) -> impl Iterator<Item = &Booking> {
        self.days.iter().filter_map(|d| match &d.disposition {
            Disposition::Created { booking } => Some(booking),
            _ => None,
        })
    }

    pub fn created_count(&self) -> usize {
        self.created().count()
    }

    pub fn skipped_dates(&self) -> Vec<NaiveDate> {
        self.days
            .iter()
            .filter(|d| d.disposition == Disposition::Skipped)
            .map(|d| d.date)
            .collect()
    }

    pub fn aborted(&self) -> bool {
        self.days.iter().any(|d| d.disposition == Disposition::Aborted)
    }
}
