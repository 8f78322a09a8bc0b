//! Step accounting engine.
//!
//! Converts raw "steps since boot" sensor readings into per-day ledger
//! deltas. The raw counter is monotonically non-decreasing within one boot
//! session and resets to zero on reboot; the engine tolerates both, plus
//! day rollovers and multi-day dormancy, without ever counting a step twice
//! or applying a negative delta.

use crate::date::DateProvider;
use crate::store::Ledger;
use crate::types::SENTINEL_DAY;
use crate::{Error, Result};

/// Apply a new raw "steps since boot" reading to the ledger and return the
/// recomputed step count for the current day.
///
/// The whole read-modify-write runs as one ledger transaction:
///
/// 1. The delta is the raw reading minus the last stored reading, clamped
///    at zero. A reboot drops the raw counter below the stored value; that
///    must never show up as negative steps.
/// 2. On the first update of a new day, the delta closes out the previous
///    latest day and a fresh entry for today starts at zero. Otherwise the
///    delta goes straight to today's entry.
/// 3. The sentinel entry is overwritten with the raw reading so future
///    deltas are computed against this baseline.
///
/// On an empty ledger the first reading has no prior baseline day, so its
/// delta is discarded as day-one setup: today is seeded at zero and the
/// sentinel takes the raw value.
///
/// If the process was dormant across several midnights, the accumulated
/// delta closes out whichever day was latest. Skipped days cannot be
/// individually attributed, so they get no entries.
pub fn update_steps_since_boot(
    ledger: &Ledger,
    dates: &impl DateProvider,
    raw: u64,
) -> Result<i64> {
    let raw = i64::try_from(raw)
        .map_err(|_| Error::Sensor(format!("raw step reading {} out of range", raw)))?;
    let today = dates.today();

    ledger.transact(|tx| {
        let stored = tx.steps_since_boot();
        let delta = (raw - stored).max(0);

        if tx.steps(today).is_none() {
            // First update of a new day: close out the previous latest day,
            // then open today at zero.
            tx.add_to_latest_entry(delta);
            tx.upsert(today, 0);
        } else {
            tx.add_to_latest_entry(delta);
        }

        tx.set_steps_since_boot(raw);

        let steps_today = tx.steps(today).unwrap_or(0).max(0);
        tracing::debug!(raw, stored, delta, steps_today, "Accounting update");
        Ok(steps_today)
    })
}

/// Today's step count, 0 when no entry exists yet.
pub fn steps_today(ledger: &Ledger, dates: &impl DateProvider) -> Result<i64> {
    Ok(ledger.steps(dates.today())?.unwrap_or(0).max(0))
}

/// Administrative overwrite for backup restore. Bypasses the accounting
/// algorithm entirely. Returns true if a fresh entry was created, false if
/// an existing entry was overwritten.
pub fn restore_day(ledger: &Ledger, day: i64, steps: i64) -> Result<bool> {
    if day <= SENTINEL_DAY {
        return Err(Error::Store(format!(
            "cannot restore reserved day {}",
            day
        )));
    }
    if steps < 0 {
        return Err(Error::Store(format!(
            "cannot restore negative step count {}",
            steps
        )));
    }
    ledger.transact(|tx| Ok(tx.overwrite_or_insert(day, steps)))
}

/// Platform boot hook. Resets the sentinel to zero so steps taken between
/// boot and the first sensor sample are not swallowed by the reboot clamp,
/// and purges any leftover negative rows.
pub fn mark_reboot(ledger: &Ledger) -> Result<()> {
    ledger.transact(|tx| {
        let removed = tx.remove_negative_entries();
        tx.set_steps_since_boot(0);
        tracing::info!(removed, "Marked reboot, sensor baseline reset");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::FixedDate;

    fn fixed_day(day: i64) -> FixedDate {
        FixedDate {
            day,
            day_of_month: 1,
            day_of_year: 1,
        }
    }

    fn open_ledger(dir: &tempfile::TempDir) -> Ledger {
        Ledger::open(dir.path()).unwrap()
    }

    #[test]
    fn test_bootstrap_discards_first_delta() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        // Empty ledger, first reading ever
        let steps = update_steps_since_boot(&ledger, &fixed_day(18924), 1500).unwrap();

        assert_eq!(steps, 0);
        assert_eq!(ledger.steps(18924).unwrap(), Some(0));
        assert_eq!(ledger.steps_since_boot().unwrap(), 1500);
    }

    #[test]
    fn test_same_day_update_accumulates_delta() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        // Day 100 at 5000 steps, sentinel 5000
        ledger
            .transact(|tx| {
                tx.upsert(100, 5000);
                tx.set_steps_since_boot(5000);
                Ok(())
            })
            .unwrap();

        let steps = update_steps_since_boot(&ledger, &fixed_day(100), 5200).unwrap();

        assert_eq!(steps, 5200);
        assert_eq!(ledger.steps(100).unwrap(), Some(5200));
        assert_eq!(ledger.steps_since_boot().unwrap(), 5200);
    }

    #[test]
    fn test_rollover_closes_previous_day() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        // Day 100 at 5200, sentinel 5200, first update arrives on day 101
        ledger
            .transact(|tx| {
                tx.upsert(100, 5200);
                tx.set_steps_since_boot(5200);
                Ok(())
            })
            .unwrap();

        let steps = update_steps_since_boot(&ledger, &fixed_day(101), 5300).unwrap();

        assert_eq!(steps, 0);
        assert_eq!(ledger.steps(100).unwrap(), Some(5300));
        assert_eq!(ledger.steps(101).unwrap(), Some(0));
        assert_eq!(ledger.steps_since_boot().unwrap(), 5300);
    }

    #[test]
    fn test_reboot_clamps_delta_to_zero() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        // Day 101 at 0, sentinel 5300, then a reboot
        ledger
            .transact(|tx| {
                tx.upsert(101, 0);
                tx.set_steps_since_boot(5300);
                Ok(())
            })
            .unwrap();

        let steps = update_steps_since_boot(&ledger, &fixed_day(101), 50).unwrap();

        assert_eq!(steps, 0);
        assert_eq!(ledger.steps(101).unwrap(), Some(0));
        assert_eq!(ledger.steps_since_boot().unwrap(), 50);
    }

    #[test]
    fn test_repeated_reading_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        update_steps_since_boot(&ledger, &fixed_day(100), 1000).unwrap();
        let first = update_steps_since_boot(&ledger, &fixed_day(100), 1500).unwrap();
        let second = update_steps_since_boot(&ledger, &fixed_day(100), 1500).unwrap();

        assert_eq!(first, 500);
        assert_eq!(second, 500);
        assert_eq!(ledger.steps(100).unwrap(), Some(500));
    }

    #[test]
    fn test_multi_day_gap_merges_into_latest_day() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        ledger
            .transact(|tx| {
                tx.upsert(100, 2000);
                tx.set_steps_since_boot(2000);
                Ok(())
            })
            .unwrap();

        // Dormant across three midnights, next update on day 103
        let steps = update_steps_since_boot(&ledger, &fixed_day(103), 9000).unwrap();

        assert_eq!(steps, 0);
        assert_eq!(ledger.steps(100).unwrap(), Some(9000));
        assert_eq!(ledger.steps(101).unwrap(), None);
        assert_eq!(ledger.steps(102).unwrap(), None);
        assert_eq!(ledger.steps(103).unwrap(), Some(0));
    }

    #[test]
    fn test_reboot_then_new_steps_count_from_new_baseline() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        ledger
            .transact(|tx| {
                tx.upsert(101, 700);
                tx.set_steps_since_boot(5300);
                Ok(())
            })
            .unwrap();

        // Reboot reading, then more walking within the same day
        update_steps_since_boot(&ledger, &fixed_day(101), 50).unwrap();
        let steps = update_steps_since_boot(&ledger, &fixed_day(101), 250).unwrap();

        assert_eq!(steps, 900);
    }

    #[test]
    fn test_mark_reboot_recovers_pre_sample_steps() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        ledger
            .transact(|tx| {
                tx.upsert(101, 700);
                tx.set_steps_since_boot(5300);
                Ok(())
            })
            .unwrap();

        // Boot hook runs before the first post-boot sample
        mark_reboot(&ledger).unwrap();
        assert_eq!(ledger.steps_since_boot().unwrap(), 0);

        // The 50 steps walked since boot are now counted, not clamped away
        let steps = update_steps_since_boot(&ledger, &fixed_day(101), 50).unwrap();
        assert_eq!(steps, 750);
    }

    #[test]
    fn test_steps_today_defaults_to_zero() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        assert_eq!(steps_today(&ledger, &fixed_day(100)).unwrap(), 0);

        ledger
            .transact(|tx| {
                tx.upsert(100, 4321);
                Ok(())
            })
            .unwrap();
        assert_eq!(steps_today(&ledger, &fixed_day(100)).unwrap(), 4321);
    }

    #[test]
    fn test_restore_day_reports_created_and_overwritten() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        assert!(restore_day(&ledger, 100, 5000).unwrap());
        assert!(!restore_day(&ledger, 100, 6000).unwrap());
        assert_eq!(ledger.steps(100).unwrap(), Some(6000));
    }

    #[test]
    fn test_restore_day_rejects_reserved_day_and_negative_steps() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        assert!(restore_day(&ledger, SENTINEL_DAY, 100).is_err());
        assert!(restore_day(&ledger, 100, -1).is_err());
    }

    #[test]
    fn test_sensor_glitch_loses_no_steps_permanently() {
        let temp_dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&temp_dir);

        ledger
            .transact(|tx| {
                tx.upsert(100, 1000);
                tx.set_steps_since_boot(1000);
                Ok(())
            })
            .unwrap();

        // Backward jump without reboot: clamped, nothing goes negative
        update_steps_since_boot(&ledger, &fixed_day(100), 900).unwrap();
        assert_eq!(ledger.steps(100).unwrap(), Some(1000));

        // Counter recovers past the old baseline
        let steps = update_steps_since_boot(&ledger, &fixed_day(100), 1100).unwrap();
        assert_eq!(steps, 1200);
    }
}
