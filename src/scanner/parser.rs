//! # Kalibrate Output Parser
//!
//! Extracts channel measurements from `kal -s` output.
//!
//! Channel lines look like:
//!
//! ```text
//!     chan: 1 (935.2MHz + 1.234kHz)    power: 123456.78
//!     chan: 37 (942.4MHz - 543Hz)      power: 98765.43
//! ```
//!
//! Every other line (banner, band header, blank) is ignored.

use crate::document::ChannelMeasurement;

/// Parse every channel line in the scanner output
pub fn parse_scan_output(output: &str) -> Vec<ChannelMeasurement> {
    output.lines().filter_map(parse_channel_line).collect()
}

/// Parse one channel line, `None` when the line is not a channel line
pub fn parse_channel_line(line: &str) -> Option<ChannelMeasurement> {
    let rest = line.trim().strip_prefix("chan:")?;

    let (channel, rest) = rest.split_once('(')?;
    let channel: u32 = channel.trim().parse().ok()?;

    let (frequency, rest) = rest.split_once(')')?;
    let (freq, offset_hz) = parse_frequency(frequency)?;

    let power = rest.trim().strip_prefix("power:")?.trim();
    let power: f64 = power.parse().ok()?;

    Some(ChannelMeasurement {
        channel: Some(channel),
        freq,
        offset_hz,
        power,
    })
}

/// Parse `935.2MHz + 1.234kHz` into (MHz, offset in Hz)
fn parse_frequency(text: &str) -> Option<(f64, Option<f64>)> {
    let mut parts = text.split_whitespace();

    let freq = parse_with_unit(parts.next()?)? / 1_000_000.0;

    let offset = match (parts.next(), parts.next()) {
        (Some(sign), Some(value)) => {
            let value = parse_with_unit(value)?;
            match sign {
                "+" => Some(value),
                "-" => Some(-value),
                _ => return None,
            }
        }
        (None, None) => None,
        _ => return None,
    };

    Some((freq, offset))
}

/// Parse a value with a `Hz`/`kHz`/`MHz` suffix into Hz
fn parse_with_unit(text: &str) -> Option<f64> {
    let (number, scale) = if let Some(n) = text.strip_suffix("MHz") {
        (n, 1_000_000.0)
    } else if let Some(n) = text.strip_suffix("kHz") {
        (n, 1_000.0)
    } else if let Some(n) = text.strip_suffix("Hz") {
        (n, 1.0)
    } else {
        return None;
    };
    number.parse::<f64>().ok().map(|n| n * scale)
}
