//! # Pipeline Workers
//!
//! The four long-running loops of the pipeline:
//!
//! ```text
//! RadioScanProducer ─┐
//!                    ├─► ScanQueue ─► EnrichmentWorker ─► WriteQueue ─► WriteWorker ─► record log
//! TelemetryProducer ─┘                       │
//!                                            └─► last known location ─► RadioScanProducer
//! ```
//!
//! A worker only returns when it fails; the supervisor restarts it.

pub mod enricher;
pub mod radio_scan;
pub mod telemetry;
pub mod writer;

use async_trait::async_trait;

use crate::error::Result;

pub use enricher::EnrichmentWorker;
pub use radio_scan::RadioScanProducer;
pub use telemetry::TelemetryProducer;
pub use writer::WriteWorker;

/// A restartable pipeline loop
///
/// `run` may be called again after it returns; each call starts the loop
/// afresh with the same configuration.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Name used in supervisor logs
    fn name(&self) -> &str;

    /// Run until failure
    async fn run(&self) -> Result<()>;
}
