//! # SIM808 Session
//!
//! AT-command session with a SIM808 module over a serial port.

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

use super::parser::parse_line;
use super::port_trait::{ModemPort, TokioSerialPort};
use super::{ModemConnector, ModemSession};
use crate::document::TelemetryLine;
use crate::error::{Result, SitchError};

/// Commands sent right after the port opens
const INIT_COMMANDS: &[&str] = &[
    "ATE0",        // Echo off
    "AT+CENG=2,1", // Engineering mode with periodic cell reports
];

/// Engineering-mode session over any [`ModemPort`]
pub struct Sim808Session<P> {
    port: P,
}

impl<P> std::fmt::Debug for Sim808Session<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sim808Session").finish_non_exhaustive()
    }
}

impl<P: ModemPort> Sim808Session<P> {
    /// Wrap a port and switch the modem into engineering mode
    pub async fn start(port: P) -> Result<Self> {
        let mut session = Self { port };
        for command in INIT_COMMANDS {
            session.send(command).await?;
        }
        Ok(session)
    }

    async fn send(&mut self, command: &str) -> Result<()> {
        debug!("SIM808 <- {}", command);
        self.port
            .write_line(command)
            .await
            .map_err(|e| SitchError::Modem(format!("Failed to send {}: {}", command, e)))
    }
}

#[async_trait]
impl<P: ModemPort> ModemSession for Sim808Session<P> {
    async fn set_band(&mut self, band: &str) -> Result<()> {
        self.send(&format!("AT+CBAND=\"{}\"", band)).await
    }

    async fn trigger_gps(&mut self) -> Result<()> {
        self.send("AT+CGNSPWR=1").await?;
        self.send("AT+CGNSURC=1").await
    }

    async fn next_line(&mut self) -> Result<Option<TelemetryLine>> {
        loop {
            let line = self
                .port
                .read_line()
                .await
                .map_err(|e| SitchError::Modem(format!("Failed to read from modem: {}", e)))?;

            let Some(line) = line else {
                return Ok(None);
            };

            if let Some(parsed) = parse_line(&line) {
                return Ok(Some(parsed));
            }
            if !line.is_empty() {
                debug!("SIM808 -> {} (ignored)", line);
            }
        }
    }
}

/// Opens [`Sim808Session`]s on real serial ports
#[derive(Debug, Clone)]
pub struct Sim808Connector {
    baud_rate: u32,
}

impl Sim808Connector {
    pub fn new(baud_rate: u32) -> Self {
        Self { baud_rate }
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(&self, path: &str) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| SitchError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

#[async_trait]
impl ModemConnector for Sim808Connector {
    async fn open(&self, port: &str) -> Result<Box<dyn ModemSession>> {
        let stream = self.open_port(port)?;
        info!("Opened SIM808 at {} ({} baud)", port, self.baud_rate);
        let session = Sim808Session::start(TokioSerialPort::new(stream)).await?;
        Ok(Box::new(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::port_trait::mocks::MockModemPort;
    use std::io;

    #[tokio::test]
    async fn test_start_enables_engineering_mode() {
        let port = MockModemPort::new(&[]);
        Sim808Session::start(port.clone()).await.unwrap();
        assert_eq!(port.get_written_lines(), vec!["ATE0", "AT+CENG=2,1"]);
    }

    #[tokio::test]
    async fn test_setup_commands() {
        let port = MockModemPort::new(&[]);
        let mut session = Sim808Session::start(port.clone()).await.unwrap();

        session.set_band("EGSM_MODE").await.unwrap();
        session.trigger_gps().await.unwrap();

        let written = port.get_written_lines();
        assert_eq!(
            &written[2..],
            &["AT+CBAND=\"EGSM_MODE\"", "AT+CGNSPWR=1", "AT+CGNSURC=1"]
        );
    }

    #[tokio::test]
    async fn test_next_line_skips_noise() {
        let port = MockModemPort::new(&[
            "OK",
            "",
            "+CSQ: 20,0",
            "+CGNSINF: 1,0,,,,,,,,,,,,,,,,,,,",
            "+CENG: 1,\"0045,22,17,1b2c,310,260,5e2f\"",
        ]);
        let mut session = Sim808Session::start(port).await.unwrap();

        let first = session.next_line().await.unwrap().unwrap();
        assert_eq!(first.kind, "signal");
        assert_eq!(first.fields["rssi"], -73);

        let second = session.next_line().await.unwrap().unwrap();
        assert_eq!(second.kind, "cell");

        assert!(session.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_error_is_modem_error() {
        let port = MockModemPort::new(&["+CSQ: 20,0"]);
        port.set_read_error(io::ErrorKind::BrokenPipe);
        let mut session = Sim808Session::start(port).await.unwrap();

        assert!(matches!(session.next_line().await, Err(SitchError::Modem(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_line_noise_does_not_end_session() {
        use tokio::io::AsyncWriteExt;

        let (mut modem, host) = tokio_serial::SerialStream::pair().unwrap();
        modem.write_all(b"\xff\xfe\r\n+CSQ: 20,0\r\n").await.unwrap();
        modem.flush().await.unwrap();

        let mut session = Sim808Session {
            port: TokioSerialPort::new(host),
        };
        let line = session.next_line().await.unwrap().unwrap();
        assert_eq!(line.kind, "signal");
        assert_eq!(line.fields["rssi"], -73);
    }

    #[tokio::test]
    async fn test_write_error_fails_start() {
        let port = MockModemPort::new(&[]);
        port.set_write_error(io::ErrorKind::TimedOut);

        match Sim808Session::start(port).await {
            Err(SitchError::Modem(msg)) => assert!(msg.contains("ATE0")),
            other => panic!("Expected Modem error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_open_invalid_port_is_serial_error() {
        let connector = Sim808Connector::new(9600);
        match connector.open("/dev/nonexistent_serial_device_12345").await {
            Err(SitchError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            Err(other) => panic!("Expected Serial error, got: {:?}", other),
            Ok(_) => panic!("Expected Serial error, got a session"),
        }
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_session_with_real_hardware() {
        let connector = Sim808Connector::new(9600);
        if let Ok(mut session) = connector.open("/dev/ttyAMA0").await {
            session.set_band("EGSM_MODE").await.unwrap();
            session.trigger_gps().await.unwrap();
            if let Ok(Some(line)) = session.next_line().await {
                println!("First line: {:?}", line);
            }
        } else {
            println!("No SIM808 hardware detected (skipping)");
        }
    }
}
