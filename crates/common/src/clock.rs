//! The time window a run covers.
//!
//! The archive publishes frames with some lag, so a run anchors itself to
//! "now minus a margin", captured exactly once. Both the archive index URL
//! and the artifact filename are derived from that single value.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SuncastError, SuncastResult};

/// Hour-resolution point in time (UTC) that a pipeline run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    year: i32,
    month: u32,
    day: u32,
    hour: u32,
}

impl TimeWindow {
    /// Capture the window from the current UTC time, offset backward by
    /// `lag_minutes` to account for publication delay.
    pub fn capture(lag_minutes: i64) -> Self {
        let now = Utc::now() - chrono::Duration::minutes(lag_minutes);
        Self::from_datetime(now)
    }

    /// Build a window from an explicit instant.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
            day: at.day(),
            hour: at.hour(),
        }
    }

    /// Build a window from calendar components, rejecting impossible dates.
    pub fn new(year: i32, month: u32, day: u32, hour: u32) -> SuncastResult<Self> {
        if NaiveDate::from_ymd_opt(year, month, day).is_none() || hour > 23 {
            return Err(SuncastError::config(format!(
                "invalid time window {year:04}-{month:02}-{day:02}T{hour:02}"
            )));
        }
        Ok(Self {
            year,
            month,
            day,
            hour,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Daily browse index on the archive host, e.g.
    /// `https://sdo.gsfc.nasa.gov/assets/img/browse/2024/03/15/`.
    pub fn index_url(&self, base_url: &str) -> String {
        format!(
            "{}/assets/img/browse/{:04}/{:02}/{:02}/",
            base_url.trim_end_matches('/'),
            self.year,
            self.month,
            self.day
        )
    }

    /// Artifact filename, e.g. `2024_03_15_14.gif`.
    pub fn artifact_filename(&self) -> String {
        format!(
            "{:04}_{:02}_{:02}_{:02}.gif",
            self.year, self.month, self.day, self.hour
        )
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}Z",
            self.year, self.month, self.day, self.hour
        )
    }
}
