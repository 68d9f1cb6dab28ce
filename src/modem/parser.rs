//! # SIM808 Line Parser
//!
//! Decodes engineering-mode and GNSS responses into telemetry lines.
//!
//! Recognised responses:
//! - `+CSQ: <rssi>,<ber>` signal quality
//! - `+CENG: <cell>,"<values>"` serving/neighbour cell info
//! - `+UGNSINF: ...` / `+CGNSINF: ...` GNSS navigation info

use chrono::{NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use crate::document::{TelemetryLine, GPS_KIND};

/// Valid CSQ readings; 99 and anything else mean "not known"
const CSQ_RANGE: std::ops::RangeInclusive<i64> = 0..=31;

const SERVING_CELL_KEYS: &[&str] = &[
    "arfcn", "rxl", "rxq", "mcc", "mnc", "bsic", "cellid", "rla", "txp", "lac", "ta",
];

const NEIGHBOR_CELL_KEYS: &[&str] = &["arfcn", "rxl", "bsic", "cellid", "mcc", "mnc", "lac"];

/// Parse one modem line, `None` for lines that carry no telemetry
pub fn parse_line(line: &str) -> Option<TelemetryLine> {
    let line = line.trim();
    let (command, body) = line.split_once(':')?;
    let body = body.trim();

    match command {
        "+CSQ" => parse_signal(body),
        "+CENG" => parse_cell(body),
        "+UGNSINF" | "+CGNSINF" => parse_gnss(body),
        _ => None,
    }
}

fn parse_signal(body: &str) -> Option<TelemetryLine> {
    let mut parts = body.split(',').map(str::trim);
    let csq: i64 = parts.next()?.parse().ok()?;
    let ber: i64 = parts.next()?.parse().ok()?;

    if !CSQ_RANGE.contains(&csq) {
        return None;
    }

    let mut fields = Map::new();
    fields.insert("rssi".into(), Value::from(-113 + 2 * csq));
    fields.insert("ber".into(), Value::from(ber));
    Some(TelemetryLine::new("signal", fields))
}

fn parse_cell(body: &str) -> Option<TelemetryLine> {
    let (cell, values) = body.split_once(',')?;
    let cell: i64 = cell.trim().parse().ok()?;
    let values = values.trim().trim_matches('"');
    // The modem pads unused neighbour slots with empty entries
    if values.is_empty() {
        return None;
    }

    let keys = if cell == 0 { SERVING_CELL_KEYS } else { NEIGHBOR_CELL_KEYS };

    let mut fields = Map::new();
    fields.insert("cell".into(), Value::from(cell));
    for (key, raw) in keys.iter().zip(values.split(',')) {
        fields.insert((*key).into(), scalar(raw.trim()));
    }
    Some(TelemetryLine::new("cell", fields))
}

/// Fields of a GNSS info response, in order:
/// run, fix, utc, lat, lon, altitude, speed, course, fix mode, reserved,
/// HDOP, PDOP, VDOP, reserved, satellites in view, satellites used, ...
fn parse_gnss(body: &str) -> Option<TelemetryLine> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();

    let fix_status: u8 = parts.get(1)?.parse().ok()?;
    if fix_status == 0 {
        return None;
    }

    let lat: f64 = parts.get(3)?.parse().ok()?;
    let lon: f64 = parts.get(4)?.parse().ok()?;

    let mut fields = Map::new();
    fields.insert("lat".into(), number(lat)?);
    fields.insert("lon".into(), number(lon)?);

    if let Some(timestamp) = parts.get(2).and_then(|utc| parse_gnss_time(utc)) {
        fields.insert("timestamp".into(), Value::from(timestamp));
    }

    let fix_quality = parts
        .get(8)
        .and_then(|mode| mode.parse::<u8>().ok())
        .unwrap_or(fix_status);
    fields.insert("fix_quality".into(), Value::from(fix_quality));

    if let Some(altitude) = parts.get(5).and_then(|a| a.parse::<f64>().ok()).and_then(number) {
        fields.insert("altitude".into(), altitude);
    }

    if let Some(satellites) = parts.get(15).and_then(|s| s.parse::<u32>().ok()) {
        fields.insert("satellites".into(), Value::from(satellites));
    }

    Some(TelemetryLine::new(GPS_KIND, fields))
}

/// `yyyyMMddhhmmss.sss` UTC into RFC 3339
fn parse_gnss_time(utc: &str) -> Option<String> {
    let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%d%H%M%S%.f").ok()?;
    Some(Utc.from_utc_datetime(&naive).to_rfc3339())
}

fn number(value: f64) -> Option<Value> {
    Number::from_f64(value).map(Value::Number)
}

/// Integers stay numeric, anything else (hex cell ids) stays text
fn scalar(raw: &str) -> Value {
    raw.parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(raw))
}
