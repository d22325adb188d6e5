//! # Sampler
//!
//! Polls the fuel gauge once per cycle and appends the result to the store.
//!
//! Each cycle reads the seven registers of
//! [`SAMPLED_REGISTERS`](crate::gauge::registers::SAMPLED_REGISTERS) in table
//! order, stamps the sample and appends it. A sample is only appended once all
//! seven reads succeeded. The first read error ends the loop and is returned
//! to the caller.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::Result;
use crate::gauge::codec::{to_amps, to_percent, to_volts};
use crate::gauge::reader::RegisterReader;
use crate::gauge::registers::{
    AVG_CELL1, AVG_CELL2, AVG_CURRENT, FULL_SOC_THR, ICHG_TERM, REP_SOC, VFSOC,
};
use crate::remote::RemoteShell;
use crate::store::{Sample, SharedStore, Timestamp};

/// Number of samples between status log messages
const LOG_INTERVAL_SAMPLES: u64 = 100;

/// Register polling loop, the only writer of the store
pub struct Sampler<S> {
    reader: RegisterReader<S>,
    store: SharedStore,
    interval: Duration,
    sense_resistor_milliohm: f64,
}

impl<S: RemoteShell> Sampler<S> {
    /// Create a sampler
    ///
    /// # Arguments
    ///
    /// * `reader` - Register reader for the gauge
    /// * `store` - Store receiving every sample
    /// * `interval` - Pause between the end of one cycle and the next
    /// * `sense_resistor_milliohm` - Used only to log currents in amps
    pub fn new(
        reader: RegisterReader<S>,
        store: SharedStore,
        interval: Duration,
        sense_resistor_milliohm: f64,
    ) -> Self {
        Self {
            reader,
            store,
            interval,
            sense_resistor_milliohm,
        }
    }

    /// Read every sampled register once
    ///
    /// # Errors
    ///
    /// Returns the first `Command` or `Parse` error; no sample is produced.
    pub async fn sample_once(&self) -> Result<Sample> {
        let vfsoc = self.reader.read_unsigned(VFSOC.address).await?;
        let full_soc_thr = self.reader.read_unsigned(FULL_SOC_THR.address).await?;
        let avg_current = self.reader.read_signed(AVG_CURRENT.address).await?;
        let ichg_term = self.reader.read_signed(ICHG_TERM.address).await?;
        let avg_cell1 = self.reader.read_unsigned(AVG_CELL1.address).await?;
        let avg_cell2 = self.reader.read_unsigned(AVG_CELL2.address).await?;
        let rep_soc = self.reader.read_unsigned(REP_SOC.address).await?;

        Ok(Sample {
            timestamp: Timestamp::now(),
            vfsoc,
            full_soc_thr,
            avg_current,
            ichg_term,
            avg_cell1,
            avg_cell2,
            rep_soc,
        })
    }

    /// Poll until a read fails
    ///
    /// # Errors
    ///
    /// Returns the read error that stopped the loop. Samples appended before
    /// the failure stay in the store.
    pub async fn run(self) -> Result<()> {
        info!("Sampling fuel gauge every {:?}", self.interval);
        let mut cycles: u64 = 0;

        loop {
            let sample = self.sample_once().await?;
            let len = self.store.append(sample);
            cycles += 1;

            debug!("Appended sample #{} ({} in store)", cycles, len);
            if cycles % LOG_INTERVAL_SAMPLES == 0 {
                info!(
                    "{} samples this run: RepSOC {:.1}%, AvgCurrent {:.3} A, cells {:.3} V / {:.3} V",
                    cycles,
                    to_percent(sample.rep_soc),
                    to_amps(sample.avg_current, self.sense_resistor_milliohm),
                    to_volts(sample.avg_cell1),
                    to_volts(sample.avg_cell2),
                );
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
