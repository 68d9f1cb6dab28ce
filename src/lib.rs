//! # SITCH Sensor Library
//!
//! Field sensor runner for GSM band scans and SIM808 engineering data.
//!
//! This library provides the in-process pipeline that turns Kalibrate band
//! scans and cellular-modem telemetry (including GPS fixes) into structured
//! log records for shipment to a central collector.

pub mod config;
pub mod document;
pub mod enrichment;
pub mod error;
pub mod location;
pub mod modem;
pub mod pipeline;
pub mod queue;
pub mod record_log;
pub mod scanner;
pub mod startup;
pub mod supervisor;
pub mod workers;
