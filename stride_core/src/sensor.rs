//! Step sensor sources.
//!
//! The accounting engine consumes raw "steps since boot" readings from a
//! [`StepSource`]. A reading of `None` means no sensor is available, in
//! which case accounting is never invoked.

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Source of raw "steps since boot" readings.
pub trait StepSource {
    /// Latest raw reading, or None when no sensor is available.
    fn read(&mut self) -> Result<Option<u64>>;
}

/// Step source backed by a text file holding a decimal counter value,
/// typically a sysfs-style node or a file written by a platform agent.
pub struct FileStepSource {
    path: PathBuf,
}

impl FileStepSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StepSource for FileStepSource {
    fn read(&mut self) -> Result<Option<u64>> {
        if !self.path.exists() {
            tracing::debug!("No step sensor file at {:?}", self.path);
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let value = contents.trim().parse::<u64>().map_err(|e| {
            Error::Sensor(format!(
                "unreadable step count in {:?}: {}",
                self.path, e
            ))
        })?;

        tracing::debug!(value, "Read step sensor");
        Ok(Some(value))
    }
}
