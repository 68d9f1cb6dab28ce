//! Trait abstraction for line-oriented modem I/O to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Trait for modem port I/O operations
#[async_trait]
pub trait ModemPort: Send {
    /// Write one command, terminated with CR LF
    async fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Read the next line without its terminator, `None` at end of stream
    ///
    /// Bytes that are not valid UTF-8 come back as U+FFFD.
    async fn read_line(&mut self) -> io::Result<Option<String>>;
}

/// Wrapper around tokio_serial::SerialStream that implements ModemPort
pub struct TokioSerialPort {
    port: BufReader<tokio_serial::SerialStream>,
    buffer: Vec<u8>,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self {
            port: BufReader::new(port),
            buffer: Vec::new(),
        }
    }
}

#[async_trait]
impl ModemPort for TokioSerialPort {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let stream = self.port.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await
    }

    async fn read_line(&mut self) -> io::Result<Option<String>> {
        self.buffer.clear();
        if self.port.read_until(b'\n', &mut self.buffer).await? == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.buffer);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}
