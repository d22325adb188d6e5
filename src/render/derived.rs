//! # Derived Series
//!
//! Physical quantities computed from a store snapshot for display.

use crate::gauge::codec::{to_amps, to_percent, to_volts};
use crate::store::Columns;

/// Display multiplier applied to the charge termination current
pub const ICHG_TERM_DISPLAY_FACTOR: f64 = 4.0;

/// Everything the chart plots, one entry per sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedSeries {
    /// Seconds since the first sample (x-axis)
    pub elapsed_s: Vec<f64>,
    pub vfsoc_pct: Vec<f64>,
    pub full_soc_thr_pct: Vec<f64>,
    pub rep_soc_pct: Vec<f64>,
    pub avg_current_a: Vec<f64>,
    /// 4 × IChgTerm, so the termination threshold is visible on the current axis
    pub ichg_term_scaled_a: Vec<f64>,
    pub cell1_v: Vec<f64>,
    pub cell2_v: Vec<f64>,
    /// |cell1 − cell2| in millivolts
    pub cell_diff_mv: Vec<f64>,
}

impl DerivedSeries {
    /// Convert a snapshot into display units
    ///
    /// The snapshot must be consistent (all columns the same length), which
    /// every [`crate::store::SharedStore::snapshot`] is.
    pub fn from_columns(columns: &Columns, sense_resistor_milliohm: f64) -> Self {
        let elapsed_s = match columns.t.first() {
            Some(&origin) => columns.t.iter().map(|t| t.seconds_since(origin)).collect(),
            None => Vec::new(),
        };

        let cell1_v: Vec<f64> = columns.avg_cell1.iter().map(|&v| to_volts(v)).collect();
        let cell2_v: Vec<f64> = columns.avg_cell2.iter().map(|&v| to_volts(v)).collect();
        let cell_diff_mv = cell1_v
            .iter()
            .zip(&cell2_v)
            .map(|(a, b)| 1e3 * (a - b).abs())
            .collect();

        Self {
            elapsed_s,
            vfsoc_pct: columns.vfsoc.iter().map(|&v| to_percent(v)).collect(),
            full_soc_thr_pct: columns.full_soc_thr.iter().map(|&v| to_percent(v)).collect(),
            rep_soc_pct: columns.rep_soc.iter().map(|&v| to_percent(v)).collect(),
            avg_current_a: columns
                .avg_current
                .iter()
                .map(|&v| to_amps(v, sense_resistor_milliohm))
                .collect(),
            ichg_term_scaled_a: columns
                .ichg_term
                .iter()
                .map(|&v| ICHG_TERM_DISPLAY_FACTOR * to_amps(v, sense_resistor_milliohm))
                .collect(),
            cell1_v,
            cell2_v,
            cell_diff_mv,
        }
    }

    pub fn len(&self) -> usize {
        self.elapsed_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed_s.is_empty()
    }

    /// Span of the x-axis in seconds (at least 1 s so the axis never collapses)
    pub fn time_span_s(&self) -> f64 {
        self.elapsed_s.last().copied().unwrap_or(0.0).max(1.0)
    }

    /// Pair `values` with the x-axis for plotting
    pub fn points<'a>(&'a self, values: &'a [f64]) -> impl Iterator<Item = (f64, f64)> + 'a {
        self.elapsed_s.iter().copied().zip(values.iter().copied())
    }
}
