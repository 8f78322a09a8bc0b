#![forbid(unsafe_code)]

//! Core domain model and business logic for the Stride pedometer.
//!
//! This crate provides:
//! - Domain types (day entries, import summaries)
//! - Ledger store (durable per-day step counts)
//! - Step accounting engine (day rollover and reboot handling)
//! - Stats aggregation
//! - CSV backup import/export
//! - Date and sensor collaborators

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod date;
pub mod store;
pub mod engine;
pub mod sensor;
pub mod stats;
pub mod backup;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use date::{unix_day, DateProvider, FixedDate, SystemDate};
pub use store::Ledger;
pub use engine::{mark_reboot, restore_day, steps_today, update_steps_since_boot};
pub use sensor::{FileStepSource, StepSource};
pub use stats::{generate_stats, StatsReport};
pub use backup::{export_csv, import_csv};
