//! # Write Worker
//!
//! Pops output records and appends them to the record log.
//!
//! Writes are best-effort: a record that cannot be serialized or written
//! is dropped with a warning and never retried.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Worker;
use crate::document::OutputRecord;
use crate::error::Result;
use crate::queue::WriteQueue;
use crate::record_log::RecordLog;

pub struct WriteWorker {
    records: WriteQueue,
    log: Mutex<Box<dyn RecordLog>>,
    backoff: Duration,
}

impl std::fmt::Debug for WriteWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteWorker")
            .field("records", &self.records)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl WriteWorker {
    pub fn new(records: WriteQueue, log: Box<dyn RecordLog>, backoff: Duration) -> Self {
        Self {
            records,
            log: Mutex::new(log),
            backoff,
        }
    }

    /// Serialize and append one record
    ///
    /// Returns whether the record reached the log.
    pub fn write(&self, record: &OutputRecord) -> bool {
        let body = match record.payload.render() {
            Ok(body) => body,
            Err(e) => {
                warn!("Dropping {} record: {}", record.category, e);
                return false;
            }
        };

        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match log.append(&record.category, &body) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {} record: {}", record.category, e);
                false
            }
        }
    }
}

#[async_trait]
impl Worker for WriteWorker {
    fn name(&self) -> &str {
        "write worker"
    }

    async fn run(&self) -> Result<()> {
        loop {
            match self.records.pop_or_backoff(self.backoff).await {
                Some(record) => {
                    self.write(&record);
                }
                None => debug!("Write queue empty"),
            }
        }
    }
}
