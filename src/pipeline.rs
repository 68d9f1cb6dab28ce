//! # Pipeline Assembly
//!
//! Wires queues, the location cell, collaborators and workers into a
//! [`Supervisor`] ready to run.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::location::location_cell;
use crate::modem::Sim808Connector;
use crate::queue::{ScanQueue, WriteQueue};
use crate::record_log::{RecordLog, RollingRecordLog};
use crate::scanner::{BandScanner, KalScanner};
use crate::supervisor::Supervisor;
use crate::workers::{EnrichmentWorker, RadioScanProducer, TelemetryProducer, WriteWorker};

/// Build the supervisor with real collaborators
///
/// # Errors
///
/// Returns error if the record log cannot be opened.
pub fn build(config: &Config) -> Result<Supervisor> {
    let log = RollingRecordLog::from_config(&config.record_log)?;
    Ok(build_with(
        config,
        Box::new(KalScanner::new(&config.kalibrate.binary)),
        Box::new(log),
    ))
}

/// Build the supervisor around the given scanner and record log
pub fn build_with(
    config: &Config,
    scanner: Box<dyn BandScanner>,
    log: Box<dyn RecordLog>,
) -> Supervisor {
    let scans = ScanQueue::new();
    let records = WriteQueue::new();
    let (location_writer, location_reader) = location_cell();

    let radio = RadioScanProducer::new(
        scanner,
        config.device.clone(),
        config.kalibrate.clone(),
        location_reader,
        scans.clone(),
    );

    let telemetry = TelemetryProducer::new(
        Box::new(Sim808Connector::new(config.sim808.baud_rate)),
        config.device.id.clone(),
        config.sim808.clone(),
        scans.clone(),
    );

    let enricher = EnrichmentWorker::new(
        scans,
        records.clone(),
        location_writer,
        config.pipeline.enrichment_backoff(),
    );

    let writer = WriteWorker::new(records, log, config.pipeline.writer_backoff());

    Supervisor::new(config.pipeline.supervisor_interval())
        .with_worker(Arc::new(radio))
        .with_worker(Arc::new(telemetry))
        .with_worker(Arc::new(enricher))
        .with_worker(Arc::new(writer))
}
