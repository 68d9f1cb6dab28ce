//! # Enrichment Worker
//!
//! Pops scan documents, enriches them, and queues the resulting records.
//!
//! GPS documents also replace the process-wide last known location, so the
//! next band scan is stamped with the new fix.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Worker;
use crate::document::ScanDocument;
use crate::enrichment::enrich;
use crate::error::Result;
use crate::location::LocationWriter;
use crate::queue::{ScanQueue, WriteQueue};

#[derive(Debug)]
pub struct EnrichmentWorker {
    scans: ScanQueue,
    records: WriteQueue,
    location: LocationWriter,
    backoff: Duration,
}

impl EnrichmentWorker {
    pub fn new(
        scans: ScanQueue,
        records: WriteQueue,
        location: LocationWriter,
        backoff: Duration,
    ) -> Self {
        Self {
            scans,
            records,
            location,
            backoff,
        }
    }

    /// Enrich one document and queue its records
    ///
    /// Malformed documents are logged and dropped. Returns the number of
    /// records queued.
    pub fn process(&self, document: ScanDocument) -> usize {
        let enrichment = match enrich(document) {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("Dropping scan document: {}", e);
                return 0;
            }
        };

        if let Some(fix) = enrichment.location {
            debug!("Last known location now {}, {}", fix.lat, fix.lon);
            self.location.update(fix);
        }

        let count = enrichment.records.len();
        self.records.push_all(enrichment.records);
        debug!("Enriched {:?} document into {} records", enrichment.class, count);
        count
    }
}

#[async_trait]
impl Worker for EnrichmentWorker {
    fn name(&self) -> &str {
        "enrichment worker"
    }

    async fn run(&self) -> Result<()> {
        loop {
            match self.scans.pop_or_backoff(self.backoff).await {
                Some(document) => {
                    self.process(document);
                }
                None => debug!("Scan queue empty"),
            }
        }
    }
}
