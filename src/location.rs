//! # Last Known Location
//!
//! Single-slot cell holding the most recent GPS fix.
//!
//! The Enrichment Worker owns the only [`LocationWriter`]; the Radio-Scan
//! Producer holds a [`LocationReader`] and stamps each scan with a snapshot.
//! Built on a `tokio::sync::watch` channel: an update is visible to every
//! snapshot taken after it returns, and a snapshot is always a whole fix.

use tokio::sync::watch;

use crate::document::GpsFix;

/// Create a location cell, initially empty
pub fn location_cell() -> (LocationWriter, LocationReader) {
    let (tx, rx) = watch::channel(None);
    (LocationWriter { tx }, LocationReader { rx })
}

/// Write side of the location cell
#[derive(Debug)]
pub struct LocationWriter {
    tx: watch::Sender<Option<GpsFix>>,
}

impl LocationWriter {
    /// Replace the stored fix
    pub fn update(&self, fix: GpsFix) {
        self.tx.send_replace(Some(fix));
    }

    /// Hand out another reader of this cell
    pub fn reader(&self) -> LocationReader {
        LocationReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the location cell
#[derive(Debug, Clone)]
pub struct LocationReader {
    rx: watch::Receiver<Option<GpsFix>>,
}

impl LocationReader {
    /// Copy of the most recent fix, `None` before the first fix
    pub fn snapshot(&self) -> Option<GpsFix> {
        self.rx.borrow().clone()
    }
}
