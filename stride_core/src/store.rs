//! Persistent day-keyed step ledger.
//!
//! Entries are a map from epoch day index to step count, stored as a JSON
//! file with file locking. Every mutation runs as one transaction: an
//! exclusive lock on a sibling lock file is held across reload, mutation and
//! the atomic tempfile/rename commit, which serializes writers across
//! threads and processes. Readers take a shared lock and observe either the
//! pre- or post-transaction state, never a partial write.
//!
//! The reserved key [`SENTINEL_DAY`] holds the last raw "steps since boot"
//! sensor reading. All other keys are real calendar days.

use crate::types::{DayEntry, SENTINEL_DAY};
use crate::{Error, Result};
use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LEDGER_FILE: &str = "ledger.json";
const LOCK_FILE: &str = "ledger.lock";

type Entries = BTreeMap<i64, i64>;

/// Durable step ledger rooted at a data directory.
///
/// The store is explicitly constructed and injected by the composition root;
/// there is no process-wide instance. Opening is cheap, all IO happens per
/// operation under the file lock.
pub struct Ledger {
    path: PathBuf,
    lock_path: PathBuf,
}

impl Ledger {
    /// Open (or create) the ledger under the given data directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        Ok(Self {
            path: data_dir.join(LEDGER_FILE),
            lock_path: data_dir.join(LOCK_FILE),
        })
    }

    /// Path of the backing ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_handle(&self) -> Result<File> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;
        Ok(file)
    }

    fn load_entries(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Entries::new());
        }

        // The ledger is primary data; a corrupted file is a hard error, not
        // a silent reset to an empty ledger.
        serde_json::from_str(&contents)
            .map_err(|e| Error::Store(format!("ledger file {:?} is corrupted: {}", self.path, e)))
    }

    /// Atomically writes the entries by:
    /// 1. Writing to a temp file in the same directory
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn persist(&self, entries: &Entries) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store("ledger path missing parent".into()))?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(entries)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Committed ledger to {:?}", self.path);
        Ok(())
    }

    /// Run `f` as a single serialized read-modify-write transaction.
    ///
    /// Nothing is committed unless `f` succeeds; on error the on-disk state
    /// is untouched.
    pub fn transact<T>(&self, f: impl FnOnce(&mut LedgerTx) -> Result<T>) -> Result<T> {
        let lock = self.lock_handle()?;
        lock.lock_exclusive()?;

        let result = (|| -> Result<T> {
            let mut entries = self.load_entries()?;
            let out = f(&mut LedgerTx {
                entries: &mut entries,
            })?;
            self.persist(&entries)?;
            Ok(out)
        })();

        let _ = lock.unlock();
        result
    }

    /// Run `f` against a consistent snapshot of the ledger.
    pub fn snapshot<T>(&self, f: impl FnOnce(&LedgerView) -> T) -> Result<T> {
        let lock = self.lock_handle()?;
        lock.lock_shared()?;
        let loaded = self.load_entries();
        let _ = lock.unlock();

        let entries = loaded?;
        Ok(f(&LedgerView { entries: &entries }))
    }

    /// Steps recorded for a day, or None if no entry exists yet.
    pub fn steps(&self, day: i64) -> Result<Option<i64>> {
        self.snapshot(|view| view.steps(day))
    }

    /// Last raw "steps since boot" reading, 0 if never recorded.
    pub fn steps_since_boot(&self) -> Result<i64> {
        self.snapshot(|view| view.steps_since_boot())
    }

    /// All-time record day. Zero placeholder on a fresh ledger.
    pub fn record(&self) -> Result<DayEntry> {
        self.snapshot(|view| view.record())
    }

    /// Inclusive step sum over real days in `[start, end]`.
    pub fn steps_in_range(&self, start: i64, end: i64) -> Result<i64> {
        self.snapshot(|view| view.steps_in_range(start, end))
    }

    /// Number of real days with a recorded entry.
    pub fn entry_count(&self) -> Result<u64> {
        self.snapshot(|view| view.entry_count())
    }

    /// Days elapsed for averaging, always at least 1.
    pub fn days(&self, today: i64) -> Result<u64> {
        self.snapshot(|view| view.days(today))
    }

    /// Up to `num` most recent real day entries, newest first.
    pub fn last_entries(&self, num: usize) -> Result<Vec<DayEntry>> {
        self.snapshot(|view| view.last_entries(num))
    }

    /// All real day entries ascending, steps clamped to be non-negative.
    pub fn export_entries(&self) -> Result<Vec<DayEntry>> {
        self.snapshot(|view| view.export_entries())
    }
}

/// Read-only view over a consistent ledger snapshot.
pub struct LedgerView<'a> {
    entries: &'a Entries,
}

impl LedgerView<'_> {
    pub fn steps(&self, day: i64) -> Option<i64> {
        steps_of(self.entries, day)
    }

    pub fn steps_since_boot(&self) -> i64 {
        steps_of(self.entries, SENTINEL_DAY).unwrap_or(0)
    }

    pub fn latest_real_day(&self) -> Option<i64> {
        latest_real_day(self.entries)
    }

    /// The real day with the highest step count. On a ledger with no real
    /// entries yet this returns the zero placeholder `{ day: 0, steps: 0 }`.
    pub fn record(&self) -> DayEntry {
        real_days(self.entries)
            .max_by_key(|entry| entry.steps)
            .unwrap_or(DayEntry { day: 0, steps: 0 })
    }

    /// Inclusive sum over real days in `[start, end]`. The sentinel entry is
    /// never included, whatever the bounds.
    pub fn steps_in_range(&self, start: i64, end: i64) -> i64 {
        let start = start.max(SENTINEL_DAY + 1);
        if start > end {
            return 0;
        }
        self.entries.range(start..=end).map(|(_, steps)| steps).sum()
    }

    pub fn entry_count(&self) -> u64 {
        real_days(self.entries).count() as u64
    }

    /// Number of real days with steps > 0 before `today`, plus one for
    /// today. Safe to divide by, the result is at least 1.
    pub fn days(&self, today: i64) -> u64 {
        let past = real_days(self.entries)
            .filter(|entry| entry.steps > 0 && entry.day < today)
            .count() as u64;
        past + 1
    }

    pub fn last_entries(&self, num: usize) -> Vec<DayEntry> {
        real_days(self.entries).rev().take(num).collect()
    }

    pub fn export_entries(&self) -> Vec<DayEntry> {
        real_days(self.entries)
            .map(|entry| DayEntry {
                day: entry.day,
                steps: entry.display_steps(),
            })
            .collect()
    }
}

/// Mutable view of the ledger within one transaction.
pub struct LedgerTx<'a> {
    entries: &'a mut Entries,
}

impl LedgerTx<'_> {
    pub fn steps(&self, day: i64) -> Option<i64> {
        steps_of(self.entries, day)
    }

    pub fn steps_since_boot(&self) -> i64 {
        steps_of(self.entries, SENTINEL_DAY).unwrap_or(0)
    }

    pub fn latest_real_day(&self) -> Option<i64> {
        latest_real_day(self.entries)
    }

    /// Add `delta` to the real day with the maximum day index. No-op when
    /// the ledger holds no real day yet (bootstrap).
    pub fn add_to_latest_entry(&mut self, delta: i64) {
        match latest_real_day(self.entries) {
            Some(day) => {
                let steps = self.entries.entry(day).or_insert(0);
                *steps += delta;
            }
            None => {
                tracing::debug!("No day entry to add {} steps to", delta);
            }
        }
    }

    /// Insert or replace the entry for `day`.
    pub fn upsert(&mut self, day: i64, steps: i64) {
        self.entries.insert(day, steps);
    }

    /// Backup-restore primitive. Returns true if a fresh entry was created,
    /// false if an existing entry was overwritten.
    pub fn overwrite_or_insert(&mut self, day: i64, steps: i64) -> bool {
        self.entries.insert(day, steps).is_none()
    }

    /// Overwrite the sentinel entry with the latest raw sensor reading.
    pub fn set_steps_since_boot(&mut self, raw: i64) {
        self.entries.insert(SENTINEL_DAY, raw);
    }

    /// Remove real day entries with a negative step value. Returns the
    /// number of entries removed.
    pub fn remove_negative_entries(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|day, steps| *day <= SENTINEL_DAY || *steps >= 0);
        before - self.entries.len()
    }
}

fn steps_of(entries: &Entries, day: i64) -> Option<i64> {
    entries.get(&day).copied()
}

fn latest_real_day(entries: &Entries) -> Option<i64> {
    entries
        .range(SENTINEL_DAY + 1..)
        .next_back()
        .map(|(day, _)| *day)
}

fn real_days(entries: &Entries) -> impl DoubleEndedIterator<Item = DayEntry> + '_ {
    entries
        .range(SENTINEL_DAY + 1..)
        .map(|(day, steps)| DayEntry {
            day: *day,
            steps: *steps,
        })
}
