//! # Sample Types
//!
//! One polling cycle's decoded registers and the timestamp format used to
//! persist them.

use chrono::{Local, NaiveDateTime, SubsecRound};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{GaugeMonitorError, Result};

/// Format written to the persisted file (ISO-8601, local time, microseconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Accepted on load: any fractional precision, including none
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Local wall-clock instant with microsecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Current local time, truncated to microseconds
    pub fn now() -> Self {
        Self(Local::now().naive_local().trunc_subsecs(6))
    }

    /// Parse an ISO-8601 timestamp without timezone
    ///
    /// # Errors
    ///
    /// Returns `Parse` if the text is not `YYYY-MM-DDTHH:MM:SS[.ffffff]`.
    pub fn parse(text: &str) -> Result<Self> {
        NaiveDateTime::parse_from_str(text, TIMESTAMP_PARSE_FORMAT)
            .map(|t| Self(t.trunc_subsecs(6)))
            .map_err(|e| GaugeMonitorError::Parse(format!("Invalid timestamp {:?}: {}", text, e)))
    }

    /// Seconds elapsed since `origin` (negative if `origin` is later)
    pub fn seconds_since(&self, origin: Timestamp) -> f64 {
        let delta = self.0 - origin.0;
        delta.num_microseconds().map_or(delta.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// One fully assembled set of register values
///
/// Values are raw register units; see [`crate::gauge::codec`] for the
/// physical conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub timestamp: Timestamp,
    /// Voltage-based state of charge (1/256 %)
    pub vfsoc: u16,
    /// Full state-of-charge threshold (1/256 %)
    pub full_soc_thr: u16,
    /// Averaged current (current LSB)
    pub avg_current: i16,
    /// Charge termination current (current LSB)
    pub ichg_term: i16,
    /// Averaged cell 1 voltage (voltage LSB)
    pub avg_cell1: u16,
    /// Averaged cell 2 voltage (voltage LSB)
    pub avg_cell2: u16,
    /// Reported state of charge (1/256 %)
    pub rep_soc: u16,
}
