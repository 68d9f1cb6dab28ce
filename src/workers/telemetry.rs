//! # Telemetry Producer
//!
//! Streams engineering-mode lines from the modem into the scan queue.
//!
//! Opening the session is retried exactly once: field modems are often
//! still booting on the first attempt. A second failure ends the worker.
//! A session that ends without producing a line also ends the worker, so
//! the supervisor paces the reopen.

use async_trait::async_trait;
use tracing::{info, warn};

use super::Worker;
use crate::config::Sim808Config;
use crate::document::ScanDocument;
use crate::error::{Result, SitchError};
use crate::modem::{ModemConnector, ModemSession};
use crate::queue::ScanQueue;

pub struct TelemetryProducer {
    connector: Box<dyn ModemConnector>,
    device_id: String,
    sim808: Sim808Config,
    scans: ScanQueue,
}

impl std::fmt::Debug for TelemetryProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryProducer")
            .field("device_id", &self.device_id)
            .field("port", &self.sim808.port)
            .finish_non_exhaustive()
    }
}

impl TelemetryProducer {
    pub fn new(
        connector: Box<dyn ModemConnector>,
        device_id: String,
        sim808: Sim808Config,
        scans: ScanQueue,
    ) -> Self {
        Self {
            connector,
            device_id,
            sim808,
            scans,
        }
    }

    /// Open a session, with one immediate retry
    async fn open_session(&self) -> Result<Box<dyn ModemSession>> {
        match self.connector.open(&self.sim808.port).await {
            Ok(session) => Ok(session),
            Err(e) => {
                warn!("Failed to open modem at {}: {}; retrying once", self.sim808.port, e);
                self.connector.open(&self.sim808.port).await
            }
        }
    }

    /// Open and configure one session, then queue its lines until it ends
    ///
    /// Returns the number of lines queued.
    pub async fn stream_session(&self) -> Result<usize> {
        let mut session = self.open_session().await?;
        session.set_band(&self.sim808.band).await?;
        session.trigger_gps().await?;
        info!("Modem session on {} configured for {}", self.sim808.port, self.sim808.band);

        let mut queued = 0;
        while let Some(mut line) = session.next_line().await? {
            line.device_id = self.device_id.clone();
            self.scans.push(ScanDocument::Telemetry(line));
            queued += 1;
        }
        Ok(queued)
    }
}

#[async_trait]
impl Worker for TelemetryProducer {
    fn name(&self) -> &str {
        "telemetry producer"
    }

    async fn run(&self) -> Result<()> {
        loop {
            let queued = self.stream_session().await?;
            if queued == 0 {
                return Err(SitchError::Modem(format!(
                    "stream on {} ended before any line",
                    self.sim808.port
                )));
            }
            warn!("Modem stream ended after {} lines; reopening session", queued);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TelemetryLine;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Scripted session recording its setup calls
    struct MockSession {
        lines: VecDeque<TelemetryLine>,
        setup: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl ModemSession for MockSession {
        async fn set_band(&mut self, band: &str) -> Result<()> {
            self.setup.lock().unwrap().push(format!("band:{}", band));
            Ok(())
        }

        async fn trigger_gps(&mut self) -> Result<()> {
            self.setup.lock().unwrap().push("gps".to_string());
            Ok(())
        }

        async fn next_line(&mut self) -> Result<Option<TelemetryLine>> {
            Ok(self.lines.pop_front())
        }
    }

    /// Connector replaying one outcome per open attempt
    ///
    /// `Some(lines)` opens a session, `None` fails. Runs out → failure.
    #[derive(Clone)]
    struct MockConnector {
        outcomes: Arc<Mutex<VecDeque<Option<Vec<TelemetryLine>>>>>,
        attempts: Arc<Mutex<usize>>,
        setup: Arc<Mutex<Vec<String>>>,
    }

    impl MockConnector {
        fn new(outcomes: Vec<Option<Vec<TelemetryLine>>>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                attempts: Arc::new(Mutex::new(0)),
                setup: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn attempts(&self) -> usize {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl ModemConnector for MockConnector {
        async fn open(&self, port: &str) -> Result<Box<dyn ModemSession>> {
            *self.attempts.lock().unwrap() += 1;
            match self.outcomes.lock().unwrap().pop_front().flatten() {
                Some(lines) => Ok(Box::new(MockSession {
                    lines: lines.into(),
                    setup: Arc::clone(&self.setup),
                })),
                None => Err(SitchError::Serial(format!("Failed to open {}", port))),
            }
        }
    }

    fn signal(rssi: i64) -> TelemetryLine {
        let Value::Object(fields) = json!({"rssi": rssi}) else {
            unreachable!()
        };
        TelemetryLine::new("signal", fields)
    }

    fn sim808() -> Sim808Config {
        Sim808Config {
            port: "/dev/ttyAMA0".to_string(),
            baud_rate: 9600,
            band: "EGSM_MODE".to_string(),
        }
    }

    fn producer(connector: &MockConnector, scans: &ScanQueue) -> TelemetryProducer {
        TelemetryProducer::new(
            Box::new(connector.clone()),
            "dev1".to_string(),
            sim808(),
            scans.clone(),
        )
    }

    #[tokio::test]
    async fn test_lines_are_stamped_and_queued_in_order() {
        let connector = MockConnector::new(vec![Some(vec![signal(-80), signal(-75), signal(-90)])]);
        let scans = ScanQueue::new();

        let queued = producer(&connector, &scans).stream_session().await.unwrap();
        assert_eq!(queued, 3);

        let rssi: Vec<Value> = std::iter::from_fn(|| scans.try_pop())
            .map(|doc| match doc {
                ScanDocument::Telemetry(line) => {
                    assert_eq!(line.device_id, "dev1");
                    line.fields["rssi"].clone()
                }
                other => panic!("unexpected document {:?}", other),
            })
            .collect();
        assert_eq!(rssi, vec![json!(-80), json!(-75), json!(-90)]);
    }

    #[tokio::test]
    async fn test_session_setup_order() {
        let connector = MockConnector::new(vec![Some(vec![])]);
        let scans = ScanQueue::new();

        producer(&connector, &scans).stream_session().await.unwrap();
        assert_eq!(
            *connector.setup.lock().unwrap(),
            vec!["band:EGSM_MODE".to_string(), "gps".to_string()]
        );
    }

    #[tokio::test]
    async fn test_single_retry_absorbs_first_failure() {
        let connector = MockConnector::new(vec![None, Some(vec![signal(-80)])]);
        let scans = ScanQueue::new();

        let queued = producer(&connector, &scans).stream_session().await.unwrap();
        assert_eq!(queued, 1);
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_ends_worker() {
        let connector = MockConnector::new(vec![None, None, Some(vec![signal(-80)])]);
        let scans = ScanQueue::new();

        let result = producer(&connector, &scans).run().await;
        assert!(matches!(result, Err(SitchError::Serial(_))));
        assert_eq!(connector.attempts(), 2, "no retries beyond the first");
        assert!(scans.is_empty());
    }

    #[tokio::test]
    async fn test_run_reopens_after_stream_end() {
        // Two sessions, then the modem disappears for good
        let connector = MockConnector::new(vec![
            Some(vec![signal(-80)]),
            Some(vec![signal(-81), signal(-82)]),
        ]);
        let scans = ScanQueue::new();

        let result = producer(&connector, &scans).run().await;
        assert!(result.is_err());
        assert_eq!(scans.len(), 3);
        // Two successful opens plus the failed attempt and its retry
        assert_eq!(connector.attempts(), 4);
    }

    #[tokio::test]
    async fn test_empty_session_ends_worker() {
        let connector = MockConnector::new(vec![
            Some(vec![signal(-80)]),
            Some(vec![]),
            Some(vec![signal(-81)]),
        ]);
        let scans = ScanQueue::new();

        match producer(&connector, &scans).run().await {
            Err(SitchError::Modem(msg)) => assert!(msg.contains("/dev/ttyAMA0")),
            other => panic!("Expected Modem error, got: {:?}", other),
        }
        assert_eq!(connector.attempts(), 2, "no reopen after an empty session");
        assert_eq!(scans.len(), 1);
    }
}
