//! # Radio-Scan Producer
//!
//! Runs band scans back to back and queues each result for enrichment.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use super::Worker;
use crate::config::{DeviceConfig, KalibrateConfig};
use crate::document::{KalibrateScan, ScanDocument, KALIBRATE_PROGRAM};
use crate::error::Result;
use crate::location::LocationReader;
use crate::queue::ScanQueue;
use crate::scanner::BandScanner;

pub struct RadioScanProducer {
    scanner: Box<dyn BandScanner>,
    device: DeviceConfig,
    kalibrate: KalibrateConfig,
    location: LocationReader,
    scans: ScanQueue,
}

impl std::fmt::Debug for RadioScanProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioScanProducer")
            .field("band", &self.kalibrate.band)
            .field("gain", &self.kalibrate.gain)
            .finish_non_exhaustive()
    }
}

impl RadioScanProducer {
    pub fn new(
        scanner: Box<dyn BandScanner>,
        device: DeviceConfig,
        kalibrate: KalibrateConfig,
        location: LocationReader,
        scans: ScanQueue,
    ) -> Self {
        Self {
            scanner,
            device,
            kalibrate,
            location,
            scans,
        }
    }

    /// Run one scan and queue the resulting document
    ///
    /// # Errors
    ///
    /// Scanner failures propagate unchanged.
    pub async fn scan_once(&self) -> Result<()> {
        let band = &self.kalibrate.band;

        let scan_start = Utc::now();
        let scan_results = self.scanner.scan_band(band, self.kalibrate.gain).await?;
        let scan_finish = Utc::now();

        let document = KalibrateScan {
            platform: self.device.platform_name.clone(),
            scanner_name: self.device.id.clone(),
            scan_program: KALIBRATE_PROGRAM.to_string(),
            band: band.clone(),
            gain: self.kalibrate.gain,
            scan_start,
            scan_finish,
            scan_results,
            scan_location: self.location.snapshot(),
        };

        info!(
            "Sending {} scan with {} channels to enrichment queue",
            band,
            document.scan_results.len()
        );
        self.scans.push(ScanDocument::Kalibrate(document));
        Ok(())
    }
}

#[async_trait]
impl Worker for RadioScanProducer {
    fn name(&self) -> &str {
        "radio-scan producer"
    }

    async fn run(&self) -> Result<()> {
        loop {
            self.scan_once().await?;
        }
    }
}
