//! Step statistics aggregation.
//!
//! Builds weekly, monthly, yearly and all-time aggregates from ledger range
//! sums. Totals are computed up to yesterday and today's live value is added
//! on top, so a report stays consistent however far today has progressed.

use crate::config::{Config, StepUnit};
use crate::date::DateProvider;
use crate::store::Ledger;
use crate::types::DayEntry;
use crate::Result;
use serde::Serialize;

/// Aggregated step statistics at one point in time.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct StatsReport {
    /// All-time record day
    pub record: DayEntry,
    pub steps_today: i64,
    pub total_last_7_days: i64,
    pub average_last_7_days: i64,
    pub total_this_month: i64,
    pub average_this_month: i64,
    pub total_this_year: i64,
    pub average_this_year: i64,
    pub total_all_time: i64,
    pub average_all_time: i64,
}

/// Build a stats report from a single consistent ledger snapshot.
pub fn generate_stats(ledger: &Ledger, dates: &impl DateProvider) -> Result<StatsReport> {
    let today = dates.today();
    let day_of_month = i64::from(dates.day_of_month());
    let day_of_year = i64::from(dates.day_of_year());

    ledger.snapshot(|view| {
        let record = view.record();
        let steps_today = view.steps(today).unwrap_or(0).max(0);

        let previous_6_days = view.steps_in_range(today - 6, today - 1);
        let month_until_today = view.steps_in_range(today - day_of_month + 1, today - 1);
        let year_until_today = view.steps_in_range(today - day_of_year + 1, today - 1);
        let all_until_today = view.steps_in_range(0, today - 1);
        let total_days = view.days(today) as i64;

        let total_last_7_days = previous_6_days + steps_today;
        let total_this_month = month_until_today + steps_today;
        let total_this_year = year_until_today + steps_today;
        let total_all_time = all_until_today + steps_today;

        StatsReport {
            record,
            steps_today,
            total_last_7_days,
            average_last_7_days: total_last_7_days / 7,
            total_this_month,
            average_this_month: total_this_month / day_of_month,
            total_this_year,
            average_this_year: total_this_year / day_of_year,
            total_all_time,
            average_all_time: total_all_time / total_days,
        }
    })
}

/// Distance covered by `steps` using the configured step size, with its
/// display unit. None when no step size is configured.
pub fn distance_for_steps(steps: i64, config: &Config) -> Option<(f64, &'static str)> {
    let step_size = config.step_size.as_ref()?;
    let total = steps as f64 * f64::from(step_size.value);

    Some(match step_size.unit {
        StepUnit::Cm => (total / 100_000.0, "km"),
        StepUnit::Ft => (total / 5_280.0, "mi"),
    })
}
