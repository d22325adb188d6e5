//! # Chart Drawing
//!
//! Draws the fixed four-panel layout into a PNG with plotters.
//!
//! ```text
//! +--------------------------------------------------+
//! | SoC [%] 0..100            (left)                 |
//! | Current [A] -1..1         (right)                |
//! +--------------------------------------------------+
//! | Voltage [V] 0..5          (left)                 |
//! | Cell difference [mV] 0..200 (right)              |
//! +--------------------------------------------------+
//! ```

use plotters::prelude::*;
use std::error::Error;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::derived::DerivedSeries;
use crate::error::{GaugeMonitorError, Result};

const SOC_RANGE: Range<f64> = 0.0..100.0;
const CURRENT_RANGE: Range<f64> = -1.0..1.0;
const VOLTAGE_RANGE: Range<f64> = 0.0..5.0;
const CELL_DIFF_RANGE: Range<f64> = 0.0..200.0;

const FONT_SIZE_TITLE: u32 = 22;
const FONT_SIZE_AXIS: u32 = 15;
const LEGEND_LINE_LENGTH: i32 = 20;

const LIME_GREEN: RGBColor = RGBColor(50, 205, 50);
const DARK_GREEN: RGBColor = RGBColor(0, 100, 0);
const DARK_RED: RGBColor = RGBColor(139, 0, 0);
const DARK_BLUE: RGBColor = RGBColor(0, 0, 139);

/// PNG chart target
#[derive(Debug, Clone)]
pub struct Chart {
    path: PathBuf,
    width: u32,
    height: u32,
}

impl Chart {
    pub fn new(path: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            path: path.into(),
            width,
            height,
        }
    }

    /// Output image path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Redraw the whole chart from `series`
    ///
    /// The image is drawn next to the target and renamed over it, so viewers
    /// polling the file never read a half-written frame.
    ///
    /// # Errors
    ///
    /// Returns `Render` if plotters fails to draw or the image cannot be moved
    /// into place.
    pub fn draw(&self, series: &DerivedSeries) -> Result<()> {
        // plotters picks the encoder from the extension
        let tmp_path = self.path.with_extension("tmp.png");

        self.draw_panels(&tmp_path, series)
            .map_err(|e| GaugeMonitorError::Render(format!("{}: {}", self.path.display(), e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| GaugeMonitorError::Render(format!("{}: {}", self.path.display(), e)))
    }

    fn draw_panels(
        &self,
        target: &Path,
        series: &DerivedSeries,
    ) -> std::result::Result<(), Box<dyn Error>> {
        let root = BitMapBackend::new(target, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE)?;
        let root = root.titled("Streaming data", ("sans-serif", FONT_SIZE_TITLE))?;
        let panels = root.split_evenly((2, 1));
        let (upper, lower) = (&panels[0], &panels[1]);

        let x_range = 0.0..series.time_span_s();

        // State of charge + current
        let mut chart = ChartBuilder::on(upper)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .right_y_label_area_size(50)
            .build_cartesian_2d(x_range.clone(), SOC_RANGE)?
            .set_secondary_coord(x_range.clone(), CURRENT_RANGE);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .y_desc("State of charge [%]")
            .axis_desc_style(("sans-serif", FONT_SIZE_AXIS))
            .draw()?;
        chart
            .configure_secondary_axes()
            .y_desc("Current [A]")
            .axis_desc_style(("sans-serif", FONT_SIZE_AXIS))
            .draw()?;

        for (values, label, color) in [
            (&series.vfsoc_pct, "VFSOC", LIME_GREEN),
            (&series.full_soc_thr_pct, "FullSOCThr", DARK_GREEN),
            (&series.rep_soc_pct, "RepSOC", BLACK),
        ] {
            chart
                .draw_series(LineSeries::new(series.points(values), color))?
                .label(label)
                .legend(move |(x, y)| legend_line(x, y, color));
        }
        for (values, label, color) in [
            (&series.avg_current_a, "AvgCurrent", RED),
            (&series.ichg_term_scaled_a, "4xIChgTerm", DARK_RED),
        ] {
            chart
                .draw_secondary_series(LineSeries::new(series.points(values), color))?
                .label(label)
                .legend(move |(x, y)| legend_line(x, y, color));
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        // Cell voltages + imbalance
        let mut chart = ChartBuilder::on(lower)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .right_y_label_area_size(50)
            .build_cartesian_2d(x_range.clone(), VOLTAGE_RANGE)?
            .set_secondary_coord(x_range, CELL_DIFF_RANGE);

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("Elapsed [s]")
            .y_desc("Voltage [V]")
            .axis_desc_style(("sans-serif", FONT_SIZE_AXIS))
            .draw()?;
        chart
            .configure_secondary_axes()
            .y_desc("Voltage [mV]")
            .axis_desc_style(("sans-serif", FONT_SIZE_AXIS))
            .draw()?;

        for (values, label, color) in [
            (&series.cell1_v, "AvgCell1", BLUE),
            (&series.cell2_v, "AvgCell2", DARK_BLUE),
        ] {
            chart
                .draw_series(LineSeries::new(series.points(values), color))?
                .label(label)
                .legend(move |(x, y)| legend_line(x, y, color));
        }
        chart
            .draw_secondary_series(LineSeries::new(series.points(&series.cell_diff_mv), BLACK))?
            .label("Difference")
            .legend(|(x, y)| legend_line(x, y, BLACK));
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
        Ok(())
    }
}

fn legend_line(x: i32, y: i32, color: RGBColor) -> PathElement<(i32, i32)> {
    PathElement::new(vec![(x, y), (x + LEGEND_LINE_LENGTH, y)], color)
}
