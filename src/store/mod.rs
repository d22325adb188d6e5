//! # Time Series Store
//!
//! Append-only columnar history of [`Sample`]s, persisted as one JSON object.
//!
//! This module handles:
//! - Loading the previous run's history (or starting empty)
//! - Appending a sample to every column in one step
//! - Optional retention of the newest N samples
//! - Saving the history at shutdown
//!
//! ## File format
//!
//! ```json
//! {"t": ["2024-03-01T12:30:45.123456"], "VFSOC": [25600], "FullSOCThr": [24320],
//!  "AvgCurrent": [-640], "IChgTerm": [320], "AvgCell1": [53760],
//!  "AvgCell2": [53632], "RepSOC": [25344]}
//! ```
//!
//! All arrays always have the same length. Values are raw register units.
//! Timestamps are always written with six fractional digits. A loaded file
//! with shorter or missing fractions (e.g. `2024-03-01T12:30:46`) is rewritten
//! as `2024-03-01T12:30:46.000000` on the next save.

pub mod sample;
pub mod shared;

pub use sample::{Sample, Timestamp};
pub use shared::SharedStore;

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{GaugeMonitorError, Result};

/// How much history the store keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep every sample (memory and file grow without bound)
    #[default]
    Unbounded,
    /// Keep only the newest N samples
    MaxSamples(usize),
}

/// Parallel per-field columns, one row per sample
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Columns {
    pub t: Vec<Timestamp>,
    #[serde(rename = "VFSOC")]
    pub vfsoc: Vec<u16>,
    #[serde(rename = "FullSOCThr")]
    pub full_soc_thr: Vec<u16>,
    #[serde(rename = "AvgCurrent")]
    pub avg_current: Vec<i16>,
    #[serde(rename = "IChgTerm")]
    pub ichg_term: Vec<i16>,
    #[serde(rename = "AvgCell1")]
    pub avg_cell1: Vec<u16>,
    #[serde(rename = "AvgCell2")]
    pub avg_cell2: Vec<u16>,
    #[serde(rename = "RepSOC")]
    pub rep_soc: Vec<u16>,
}

impl Columns {
    /// Number of rows (length of the timestamp column)
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Lengths of all 8 columns, in file order
    pub fn column_lengths(&self) -> [usize; 8] {
        [
            self.t.len(),
            self.vfsoc.len(),
            self.full_soc_thr.len(),
            self.avg_current.len(),
            self.ichg_term.len(),
            self.avg_cell1.len(),
            self.avg_cell2.len(),
            self.rep_soc.len(),
        ]
    }

    /// True when every column has the same length
    pub fn is_consistent(&self) -> bool {
        let lengths = self.column_lengths();
        lengths.iter().all(|&n| n == lengths[0])
    }

    /// Row `index` as a sample
    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            timestamp: *self.t.get(index)?,
            vfsoc: *self.vfsoc.get(index)?,
            full_soc_thr: *self.full_soc_thr.get(index)?,
            avg_current: *self.avg_current.get(index)?,
            ichg_term: *self.ichg_term.get(index)?,
            avg_cell1: *self.avg_cell1.get(index)?,
            avg_cell2: *self.avg_cell2.get(index)?,
            rep_soc: *self.rep_soc.get(index)?,
        })
    }

    fn push(&mut self, sample: &Sample) {
        self.t.push(sample.timestamp);
        self.vfsoc.push(sample.vfsoc);
        self.full_soc_thr.push(sample.full_soc_thr);
        self.avg_current.push(sample.avg_current);
        self.ichg_term.push(sample.ichg_term);
        self.avg_cell1.push(sample.avg_cell1);
        self.avg_cell2.push(sample.avg_cell2);
        self.rep_soc.push(sample.rep_soc);
    }

    /// Drop the oldest rows so at most `max` remain
    fn truncate_front(&mut self, max: usize) {
        let excess = self.len().saturating_sub(max);
        if excess == 0 {
            return;
        }
        self.t.drain(..excess);
        self.vfsoc.drain(..excess);
        self.full_soc_thr.drain(..excess);
        self.avg_current.drain(..excess);
        self.ichg_term.drain(..excess);
        self.avg_cell1.drain(..excess);
        self.avg_cell2.drain(..excess);
        self.rep_soc.drain(..excess);
    }
}

/// Time series store bound to its backing file
#[derive(Debug)]
pub struct TimeSeriesStore {
    columns: Columns,
    path: PathBuf,
    retention: Retention,
}

impl TimeSeriesStore {
    /// Empty store that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>, retention: Retention) -> Self {
        Self {
            columns: Columns::default(),
            path: path.into(),
            retention,
        }
    }

    /// Load the store from `path`, or start empty
    ///
    /// A missing, unreadable or malformed file never blocks startup: the error
    /// is logged and an empty store is returned.
    pub fn open(path: impl Into<PathBuf>, retention: Retention) -> Self {
        let mut store = Self::new(path, retention);

        match Self::load(&store.path) {
            Ok(columns) => {
                info!("Loaded {} samples from {}", columns.len(), store.path.display());
                store.columns = columns;
                store.apply_retention();
            }
            Err(GaugeMonitorError::PersistenceLoad { reason, .. })
                if !store.path.exists() =>
            {
                info!("No history at {} ({}), starting empty", store.path.display(), reason);
            }
            Err(e) => {
                warn!("{}, starting with an empty store", e);
            }
        }

        store
    }

    /// Strictly load columns from `path`
    ///
    /// # Errors
    ///
    /// Returns `PersistenceLoad` if the file cannot be read, is not the
    /// expected JSON object, or its columns have unequal lengths.
    pub fn load(path: &Path) -> Result<Columns> {
        let load_error = |reason: String| GaugeMonitorError::PersistenceLoad {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|e| load_error(e.to_string()))?;
        let columns: Columns = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| load_error(e.to_string()))?;

        if !columns.is_consistent() {
            return Err(load_error(format!(
                "columns have unequal lengths {:?}",
                columns.column_lengths()
            )));
        }

        Ok(columns)
    }

    /// Append one sample to every column
    pub fn append(&mut self, sample: Sample) {
        self.columns.push(&sample);
        self.apply_retention();
    }

    fn apply_retention(&mut self) {
        if let Retention::MaxSamples(max) = self.retention {
            self.columns.truncate_front(max);
        }
    }

    /// Number of samples held
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Borrow the current columns
    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    /// Copy of the current columns
    pub fn snapshot(&self) -> Columns {
        self.columns.clone()
    }

    /// Backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all columns to the backing file
    ///
    /// The data is written to a sibling `.tmp` file first and then renamed
    /// over the target, so an interrupted save leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceSave` if writing or renaming fails.
    pub fn save(&self) -> Result<()> {
        let save_error = |reason: String| GaugeMonitorError::PersistenceSave {
            path: self.path.clone(),
            reason,
        };

        let tmp_path = self.tmp_path();
        let file = File::create(&tmp_path).map_err(|e| save_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);

        serde_json::to_writer(&mut writer, &self.columns).map_err(|e| save_error(e.to_string()))?;
        writer.flush().map_err(|e| save_error(e.to_string()))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| save_error(e.to_string()))?;
        drop(writer);

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            save_error(e.to_string())
        })?;

        debug!("Saved {} samples to {}", self.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(seconds: u32, soc: u16) -> Sample {
        Sample {
            timestamp: Timestamp::parse(&format!("2024-03-01T12:00:{:02}.250000", seconds)).unwrap(),
            vfsoc: soc,
            full_soc_thr: 24320,
            avg_current: -640,
            ichg_term: 320,
            avg_cell1: 53760,
            avg_cell2: 53632,
            rep_soc: soc.saturating_sub(256),
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = TimeSeriesStore::new("db.json", Retention::Unbounded);
        assert!(store.is_empty());
        assert_eq!(store.columns().column_lengths(), [0; 8]);
    }

    #[test]
    fn test_append_keeps_columns_aligned() {
        let mut store = TimeSeriesStore::new("db.json", Retention::Unbounded);
        for i in 0..25 {
            store.append(sample(i % 60, 1000 + i as u16));
            assert_eq!(store.columns().column_lengths(), [i as usize + 1; 8]);
        }
        assert_eq!(store.len(), 25);
        assert_eq!(store.columns().get(3).unwrap(), sample(3, 1003));
        assert!(store.columns().get(25).is_none());
    }

    #[test]
    fn test_retention_drops_oldest_rows() {
        let mut store = TimeSeriesStore::new("db.json", Retention::MaxSamples(3));
        for i in 0..5 {
            store.append(sample(i, i as u16));
        }

        let columns = store.snapshot();
        assert_eq!(columns.column_lengths(), [3; 8]);
        assert_eq!(columns.vfsoc, vec![2, 3, 4]);
        assert_eq!(columns.get(0).unwrap().timestamp, sample(2, 0).timestamp);
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let mut store = TimeSeriesStore::new(&path, Retention::Unbounded);
        store.append(sample(0, 25600));
        store.append(sample(1, 0));
        store.append(sample(2, 65535));
        store.save().unwrap();

        let loaded = TimeSeriesStore::load(&path).unwrap();
        assert_eq!(&loaded, store.columns());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"t\":[\"2024-03-01T12:00:00.250000\""));
        assert!(text.contains("\"AvgCurrent\":[-640,-640,-640]"));
        assert!(!dir.path().join("db.json.tmp").exists());
    }

    #[test]
    fn test_save_twice_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let mut store = TimeSeriesStore::new(&path, Retention::Unbounded);
        store.append(sample(7, 12345));
        store.save().unwrap();
        let first = fs::read(&path).unwrap();

        let reopened = TimeSeriesStore::open(&path, Retention::Unbounded);
        reopened.save().unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_loads_file_written_by_other_tools() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{"t": ["2024-03-01T12:30:45.123456", "2024-03-01T12:30:46"],
                "VFSOC": [25600, 25590], "FullSOCThr": [24320, 24320],
                "AvgCurrent": [-640, 12], "IChgTerm": [320, 320],
                "AvgCell1": [53760, 53761], "AvgCell2": [53632, 53633],
                "RepSOC": [25344, 25344]}"#,
        )
        .unwrap();

        let store = TimeSeriesStore::open(&path, Retention::Unbounded);
        assert_eq!(store.len(), 2);
        assert_eq!(store.columns().avg_current, vec![-640, 12]);
    }

    #[test]
    fn test_save_normalizes_loaded_timestamps() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{"t": ["2024-03-01T12:30:46", "2024-03-01T12:30:46.5"],
                "VFSOC": [1, 2], "FullSOCThr": [1, 2], "AvgCurrent": [1, 2],
                "IChgTerm": [1, 2], "AvgCell1": [1, 2], "AvgCell2": [1, 2],
                "RepSOC": [1, 2]}"#,
        )
        .unwrap();

        TimeSeriesStore::open(&path, Retention::Unbounded).save().unwrap();

        let saved: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            saved["t"],
            serde_json::json!(["2024-03-01T12:30:46.000000", "2024-03-01T12:30:46.500000"])
        );
    }

    #[test]
    fn test_open_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = TimeSeriesStore::open(dir.path().join("absent.json"), Retention::Unbounded);
        assert_eq!(store.columns().column_lengths(), [0; 8]);
    }

    #[test]
    fn test_open_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        for content in [
            "{not json",
            "[]",
            r#"{"t": []}"#,
            r#"{"t": ["2024-03-01T12:30:45"], "VFSOC": [1], "FullSOCThr": [1], "AvgCurrent": [1],
                "IChgTerm": [1], "AvgCell1": [1], "AvgCell2": [1], "RepSOC": []}"#,
            r#"{"t": ["2024-03-01T12:30:45"], "VFSOC": [70000], "FullSOCThr": [1], "AvgCurrent": [1],
                "IChgTerm": [1], "AvgCell1": [1], "AvgCell2": [1], "RepSOC": [1]}"#,
        ] {
            fs::write(&path, content).unwrap();
            assert!(TimeSeriesStore::load(&path).is_err(), "{} should not load", content);

            let store = TimeSeriesStore::open(&path, Retention::Unbounded);
            assert!(store.is_empty(), "{} should open empty", content);
            assert_eq!(store.columns().column_lengths(), [0; 8]);
        }
    }

    #[test]
    fn test_open_applies_retention_to_loaded_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let mut store = TimeSeriesStore::new(&path, Retention::Unbounded);
        for i in 0..10 {
            store.append(sample(i, i as u16));
        }
        store.save().unwrap();

        let trimmed = TimeSeriesStore::open(&path, Retention::MaxSamples(4));
        assert_eq!(trimmed.columns().vfsoc, vec![6, 7, 8, 9]);
    }

    #[test]
    fn test_save_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let store = TimeSeriesStore::new(dir.path().join("no/such/dir/db.json"), Retention::Unbounded);

        let result = store.save();
        assert!(matches!(result, Err(GaugeMonitorError::PersistenceSave { .. })));
    }
}
