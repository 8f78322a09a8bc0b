//! Core domain types for the Stride pedometer.

use serde::{Deserialize, Serialize};

/// Reserved ledger key whose entry caches the last raw "steps since boot"
/// sensor reading. Not a calendar day.
pub const SENTINEL_DAY: i64 = -1;

/// Steps attributed to one calendar day.
///
/// `day` is an epoch day index, where day 0 is 1970-01-01. The stored value
/// may be negative transiently (an internal offset); external consumers only
/// ever see it clamped to zero.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEntry {
    pub day: i64,
    pub steps: i64,
}

impl DayEntry {
    /// Step count as shown to external consumers, never negative.
    pub fn display_steps(&self) -> i64 {
        self.steps.max(0)
    }
}

/// Outcome of a CSV backup import.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Lines that created a fresh day entry
    pub inserted: usize,
    /// Lines that overwrote an existing day entry
    pub overwritten: usize,
    /// Lines that could not be parsed and were skipped
    pub ignored: usize,
}

impl ImportSummary {
    /// Number of entries that made it into the ledger.
    pub fn imported(&self) -> usize {
        self.inserted + self.overwritten
    }
}
