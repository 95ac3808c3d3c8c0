//! Background scans.
//!
//! A scan can take a while on a large backup directory, and the user may pick
//! another document before it finishes. Every scan started through a
//! [`ScanSession`] is stamped with a generation number; only the batch of the
//! latest generation is accepted, older ones are dropped on arrival.

use crate::error::Result;
use crate::model::ScanReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use tracing::debug;

/// Output of one background scan.
#[derive(Debug)]
pub struct ScanBatch {
    pub generation: u64,
    pub result: Result<ScanReport>,
}

#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    generation: Arc<AtomicU64>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Start a new generation, invalidating every scan still in flight.
    pub fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }

    /// Run `job` on a worker thread under a fresh generation.
    ///
    /// The receiver yields exactly one batch, or none if the worker panicked.
    pub fn spawn<F>(&self, job: F) -> Receiver<ScanBatch>
    where
        F: FnOnce() -> Result<ScanReport> + Send + 'static,
    {
        let generation = self.begin();
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = job();
            // receiver gone means the caller stopped waiting
            let _ = tx.send(ScanBatch { generation, result });
        });
        rx
    }

    /// The batch's result if it belongs to the latest generation.
    pub fn accept(&self, batch: ScanBatch) -> Option<Result<ScanReport>> {
        if self.is_current(batch.generation) {
            Some(batch.result)
        } else {
            debug!(
                stale = batch.generation,
                current = self.current(),
                "discarding stale scan batch"
            );
            None
        }
    }
}
