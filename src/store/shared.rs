//! # Shared Store Handle
//!
//! Synchronized access to the [`TimeSeriesStore`] from the sampler (single
//! writer), the renderer and the shutdown save.
//!
//! Every append and every snapshot holds the lock for the whole operation, so
//! a reader never observes columns of unequal length. A `watch` channel
//! publishes the current sample count, which lets the renderer wait for data
//! instead of sleeping for a fixed warm-up.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

use super::{Columns, Sample, TimeSeriesStore};
use crate::error::{GaugeMonitorError, Result};

/// Cloneable handle to the one store of the process
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<TimeSeriesStore>>,
    len_tx: Arc<watch::Sender<usize>>,
}

impl SharedStore {
    pub fn new(store: TimeSeriesStore) -> Self {
        let (len_tx, _) = watch::channel(store.len());
        Self {
            inner: Arc::new(RwLock::new(store)),
            len_tx: Arc::new(len_tx),
        }
    }

    // Appends never panic mid-push, so a poisoned lock still guards aligned columns
    fn read(&self) -> RwLockReadGuard<'_, TimeSeriesStore> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TimeSeriesStore> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one sample atomically and return the new length
    pub fn append(&self, sample: Sample) -> usize {
        let len = {
            let mut store = self.write();
            store.append(sample);
            store.len()
        };
        self.len_tx.send_replace(len);
        len
    }

    /// Consistent copy of all columns
    pub fn snapshot(&self) -> Columns {
        self.read().snapshot()
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Save the store to its backing file
    pub fn save(&self) -> Result<()> {
        self.read().save()
    }

    /// Receiver notified with the sample count after every append
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.len_tx.subscribe()
    }

    /// Wait until the store holds at least `min` samples
    pub async fn wait_for_samples(&self, min: usize) -> Result<()> {
        let mut rx = self.subscribe();
        rx.wait_for(|&len| len >= min)
            .await
            .map(|_| ())
            .map_err(|_| GaugeMonitorError::Task("store closed".to_string()))
    }
}
