//! # Render Module
//!
//! Live chart of the sampled history.
//!
//! This module handles:
//! - Waiting until the store holds data before the first draw
//! - Taking a consistent snapshot on every refresh tick
//! - Converting raw register units into display series
//! - Redrawing the four-panel PNG chart
//!
//! Each frame is a pure function of its snapshot, so the history may grow
//! freely between frames.

pub mod chart;
pub mod derived;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{GaugeMonitorError, Result};
use crate::store::SharedStore;
use chart::Chart;
use derived::DerivedSeries;

/// Periodic chart redraw task, a reader of the store
pub struct Renderer {
    store: SharedStore,
    chart: Chart,
    refresh: Duration,
    sense_resistor_milliohm: f64,
}

impl Renderer {
    pub fn new(
        store: SharedStore,
        chart: Chart,
        refresh: Duration,
        sense_resistor_milliohm: f64,
    ) -> Self {
        Self {
            store,
            chart,
            refresh,
            sense_resistor_milliohm,
        }
    }

    /// Draw one frame from the current store contents
    pub fn render_once(&self) -> Result<usize> {
        let columns = self.store.snapshot();
        let series = DerivedSeries::from_columns(&columns, self.sense_resistor_milliohm);
        self.chart.draw(&series)?;
        Ok(series.len())
    }

    /// Redraw until drawing fails
    ///
    /// Starts once the store holds at least one sample. Frames are drawn on
    /// the blocking thread pool; a slow frame delays the next tick rather than
    /// queuing extra frames.
    ///
    /// # Errors
    ///
    /// Returns `Render` when a frame cannot be drawn, `Task` if the drawing
    /// thread panics.
    pub async fn run(self) -> Result<()> {
        self.store.wait_for_samples(1).await?;
        info!(
            "Rendering chart to {} every {:?}",
            self.chart.path().display(),
            self.refresh
        );

        let refresh = self.refresh;
        let renderer = Arc::new(self);
        let mut ticker = interval(refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let frame = Arc::clone(&renderer);
            let points = tokio::task::spawn_blocking(move || frame.render_once())
                .await
                .map_err(|e| GaugeMonitorError::Task(format!("render task: {}", e)))??;
            debug!("Redrew chart with {} samples", points);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Retention, Sample, TimeSeriesStore, Timestamp};
    use tempfile::TempDir;

    fn sample() -> Sample {
        Sample {
            timestamp: Timestamp::now(),
            vfsoc: 25600,
            full_soc_thr: 24320,
            avg_current: -640,
            ichg_term: 320,
            avg_cell1: 53760,
            avg_cell2: 53632,
            rep_soc: 25344,
        }
    }

    #[tokio::test]
    async fn test_run_waits_for_first_sample() {
        let dir = TempDir::new().unwrap();
        let store = SharedStore::new(TimeSeriesStore::new(dir.path().join("db.json"), Retention::Unbounded));
        // Unwritable target: the first frame fails once drawing starts
        let chart = Chart::new(dir.path().join("missing/live.png"), 320, 240);
        let renderer = Renderer::new(store.clone(), chart, Duration::from_millis(5), 10.0);

        let task = tokio::spawn(renderer.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished(), "renderer drew before any sample existed");

        store.append(sample());
        let result = tokio::time::timeout(Duration::from_secs(10), task)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(GaugeMonitorError::Render(_))));
    }

    // Needs a system font for axis labels
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_render_once_draws_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = SharedStore::new(TimeSeriesStore::new(dir.path().join("db.json"), Retention::Unbounded));
        store.append(sample());
        store.append(sample());

        let chart = Chart::new(dir.path().join("live.png"), 640, 480);
        let renderer = Renderer::new(store, chart, Duration::from_millis(125), 10.0);

        assert_eq!(renderer.render_once().unwrap(), 2);
        assert!(dir.path().join("live.png").exists());
    }
}
