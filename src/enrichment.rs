//! # Enrichment
//!
//! Classifies scan documents and expands them into output records.
//!
//! | Class     | Records                                      | Side effect          |
//! |-----------|----------------------------------------------|----------------------|
//! | Kalibrate | one `KAL_CHANNEL` per channel, one `KAL_SCAN` | none                 |
//! | Telemetry | one `SIM808`                                 | none                 |
//! | GPS       | one `GPS`                                    | new last known fix   |
//!
//! Classification looks only at the document itself.

use serde_json::{Map, Value};

use crate::document::{GpsFix, KalibrateScan, OutputRecord, ScanDocument, TelemetryLine};
use crate::error::{Result, SitchError};

/// Category of per-channel band scan records
pub const KAL_CHANNEL_CATEGORY: &str = "KAL_CHANNEL";

/// Category of band scan summary records
pub const KAL_SCAN_CATEGORY: &str = "KAL_SCAN";

/// Category of modem telemetry records
pub const SIM808_CATEGORY: &str = "SIM808";

/// Category of GPS fix records
pub const GPS_CATEGORY: &str = "GPS";

/// Structural class of a scan document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentClass {
    Kalibrate,
    Telemetry,
    Gps,
}

/// Records produced from one document, in generation order
#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    pub class: DocumentClass,
    pub records: Vec<OutputRecord>,
    /// Fix carried by a GPS document
    pub location: Option<GpsFix>,
}

/// Classify a document by its shape
///
/// # Errors
///
/// Returns `MalformedDocument` when the document does not fit any class.
pub fn classify(document: &ScanDocument) -> Result<DocumentClass> {
    match document {
        ScanDocument::Kalibrate(scan) => {
            check_scan(scan)?;
            Ok(DocumentClass::Kalibrate)
        }
        ScanDocument::Telemetry(line) if line.looks_like_gps() => {
            decode_fix(line)?;
            Ok(DocumentClass::Gps)
        }
        ScanDocument::Telemetry(line) => {
            if line.fields.is_empty() {
                return Err(SitchError::MalformedDocument(format!(
                    "telemetry line '{}' carries no fields",
                    line.kind
                )));
            }
            Ok(DocumentClass::Telemetry)
        }
    }
}

/// Classify and expand a document
pub fn enrich(document: ScanDocument) -> Result<Enrichment> {
    let class = classify(&document)?;

    let enrichment = match document {
        ScanDocument::Kalibrate(scan) => Enrichment {
            class,
            records: expand_scan(&scan)?,
            location: None,
        },
        ScanDocument::Telemetry(line) if class == DocumentClass::Gps => {
            let fix = decode_fix(&line)?;
            Enrichment {
                class,
                records: vec![OutputRecord::structured(GPS_CATEGORY, tagged_fields(line))],
                location: Some(fix),
            }
        }
        ScanDocument::Telemetry(line) => Enrichment {
            class,
            records: vec![OutputRecord::structured(SIM808_CATEGORY, tagged_fields(line))],
            location: None,
        },
    };

    Ok(enrichment)
}

fn check_scan(scan: &KalibrateScan) -> Result<()> {
    if scan.scan_finish < scan.scan_start {
        return Err(SitchError::MalformedDocument(format!(
            "scan finished at {} before it started at {}",
            scan.scan_finish, scan.scan_start
        )));
    }

    if let Some(bad) = scan
        .scan_results
        .iter()
        .find(|c| !c.freq.is_finite() || !c.power.is_finite())
    {
        return Err(SitchError::MalformedDocument(format!(
            "channel {:?} has a non-finite measurement",
            bad
        )));
    }

    Ok(())
}

fn decode_fix(line: &TelemetryLine) -> Result<GpsFix> {
    serde_json::from_value(Value::Object(line.fields.clone())).map_err(|e| {
        SitchError::MalformedDocument(format!("GPS line is not a valid fix: {}", e))
    })
}

/// Reading fields plus the device identifier
fn tagged_fields(line: TelemetryLine) -> Value {
    let mut fields = line.fields;
    fields.insert("device_id".into(), Value::from(line.device_id));
    Value::Object(fields)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Channel records first, summary last
fn expand_scan(scan: &KalibrateScan) -> Result<Vec<OutputRecord>> {
    let mut metadata = Map::new();
    metadata.insert("platform".into(), Value::from(scan.platform.as_str()));
    metadata.insert("scanner_name".into(), Value::from(scan.scanner_name.as_str()));
    metadata.insert("scan_program".into(), Value::from(scan.scan_program.as_str()));
    metadata.insert("band".into(), Value::from(scan.band.as_str()));
    metadata.insert("gain".into(), Value::from(scan.gain));
    metadata.insert("scan_start".into(), serde_json::to_value(scan.scan_start)?);
    metadata.insert("scan_finish".into(), serde_json::to_value(scan.scan_finish)?);
    metadata.insert("scan_location".into(), serde_json::to_value(&scan.scan_location)?);

    let mut records = Vec::with_capacity(scan.scan_results.len() + 1);
    for channel in &scan.scan_results {
        let mut payload = metadata.clone();
        payload.extend(object(serde_json::to_value(channel)?));
        records.push(OutputRecord::structured(KAL_CHANNEL_CATEGORY, Value::Object(payload)));
    }

    let mut summary = metadata;
    summary.insert("channel_count".into(), Value::from(scan.scan_results.len()));
    records.push(OutputRecord::structured(KAL_SCAN_CATEGORY, Value::Object(summary)));

    Ok(records)
}
