//! # Scan Documents and Output Records
//!
//! Data exchanged between the pipeline workers.
//!
//! - [`ScanDocument`] is one unit of acquired data (a band scan or one modem
//!   telemetry line) on its way to enrichment.
//! - [`OutputRecord`] is one enrichment product on its way to the record log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name stamped on every band scan produced by Kalibrate
pub const KALIBRATE_PROGRAM: &str = "Kalibrate";

/// Telemetry kind carried by GPS fix lines
pub const GPS_KIND: &str = "gps";

/// One channel detected by a band scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMeasurement {
    /// ARFCN reported by the scanner
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<u32>,
    /// Channel frequency in MHz
    pub freq: f64,
    /// Measured offset from the nominal frequency in Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_hz: Option<f64>,
    /// Received power as reported by the scanner
    pub power: f64,
}

/// A GPS fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsFix {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// UTC time of the fix
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Fix quality reported by the receiver
    #[serde(default)]
    pub fix_quality: Option<u8>,
}

/// One completed Kalibrate band scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KalibrateScan {
    pub platform: String,
    pub scanner_name: String,
    pub scan_program: String,
    pub band: String,
    pub gain: f64,
    pub scan_start: DateTime<Utc>,
    pub scan_finish: DateTime<Utc>,
    pub scan_results: Vec<ChannelMeasurement>,
    /// Last known location when the scan was assembled
    pub scan_location: Option<GpsFix>,
}

/// One parsed engineering-mode line from the modem
///
/// `kind` names the reading (`signal`, `cell`, `gps`), `fields` carries its
/// values as parsed from the modem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryLine {
    pub device_id: String,
    pub kind: String,
    pub fields: Map<String, Value>,
}

impl TelemetryLine {
    /// Create a line without a device identifier
    ///
    /// The Telemetry Producer stamps the identifier before queueing.
    pub fn new(kind: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            device_id: String::new(),
            kind: kind.into(),
            fields,
        }
    }

    /// Whether the line has the shape of a GPS fix
    pub fn looks_like_gps(&self) -> bool {
        self.kind == GPS_KIND
            || (self.fields.contains_key("lat") && self.fields.contains_key("lon"))
    }
}

/// One unit of acquired data awaiting enrichment
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScanDocument {
    Kalibrate(KalibrateScan),
    Telemetry(TelemetryLine),
}

/// Payload of an output record
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already formatted, written verbatim
    Text(String),
    /// Serialized to JSON before writing
    Structured(Value),
}

impl Payload {
    /// Render the payload as the body written to the record log
    pub fn render(&self) -> serde_json::Result<String> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Structured(value) => serde_json::to_string(value),
        }
    }
}

/// One enrichment product destined for the record log
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub category: String,
    pub payload: Payload,
}

impl OutputRecord {
    pub fn structured(category: impl Into<String>, value: Value) -> Self {
        Self {
            category: category.into(),
            payload: Payload::Structured(value),
        }
    }

    pub fn text(category: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            payload: Payload::Text(text.into()),
        }
    }
}
