/// Serial transport for the servo board
///
/// A connection owns two handles on the same port: a writer used on the UI
/// thread and a reader handed to the background listener. Writes are bounded
/// by the port's write timeout; reads wait at most the short poll timeout so
/// the listener can notice a stop request.

use std::io::{self, Read, Write};

use crossbeam_channel::Sender;
use log::{debug, info, warn};

use crate::config_loader::SerialSettings;
use crate::error::PanelError;
use crate::reader::{self, ReaderHandle};

/// Longest line kept while waiting for a newline; longer input is cut here.
pub const MAX_LINE_BYTES: usize = 4096;

/// Assembles newline-terminated text lines out of a byte stream.
pub struct LineReader<R> {
    io: R,
    pending: Vec<u8>,
    chunk: Vec<u8>,
}

impl<R: Read> LineReader<R> {
    pub fn new(io: R) -> Self {
        Self {
            io,
            pending: Vec::new(),
            chunk: vec![0u8; 256],
        }
    }

    /// Return the next complete line, if one is available.
    ///
    /// Performs at most one read on the underlying handle. A read timeout is
    /// reported as `Ok(None)`; any other I/O error is returned.
    pub fn poll_line(&mut self) -> io::Result<Option<String>> {
        if let Some(line) = self.take_line() {
            return Ok(Some(line));
        }
        match self.io.read(&mut self.chunk) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.pending.extend_from_slice(&self.chunk[..n]);
                Ok(self.take_line())
            }
            Err(e) if is_idle(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn take_line(&mut self) -> Option<String> {
        loop {
            let end = match self.pending.iter().position(|&b| b == b'\n') {
                Some(pos) if pos < MAX_LINE_BYTES => pos + 1,
                _ if self.pending.len() >= MAX_LINE_BYTES => {
                    warn!(target: "transport", "No newline within {} bytes; splitting line", MAX_LINE_BYTES);
                    MAX_LINE_BYTES
                }
                _ => return None,
            };
            let raw: Vec<u8> = self.pending.drain(..end).collect();
            // Undecodable bytes are dropped, not replaced
            let line: String = String::from_utf8_lossy(&raw)
                .chars()
                .filter(|c| *c != char::REPLACEMENT_CHARACTER)
                .collect();
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
    }
}

fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

/// A live serial connection with its listener thread.
pub struct Connection {
    device: String,
    writer: Box<dyn Write + Send>,
    reader: Option<ReaderHandle>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("device", &self.device)
            .field("listening", &self.reader.is_some())
            .finish()
    }
}

impl Connection {
    /// Open `device` and start listening. Inbound lines go to `queue`.
    pub fn open(device: &str, settings: &SerialSettings, queue: Sender<String>) -> Result<Self, PanelError> {
        let fail = |source: serialport::Error| PanelError::Connection {
            device: device.to_string(),
            source: source.into(),
        };
        info!(target: "transport", "Opening {} @ {}", device, settings.baud);
        let port = serialport::new(device, settings.baud)
            .timeout(settings.read_timeout())
            .open()
            .map_err(fail)?;
        let mut writer = port.try_clone().map_err(fail)?;
        writer.set_timeout(settings.write_timeout()).map_err(fail)?;
        Self::from_parts(device, Box::new(writer), Box::new(port), settings, queue)
    }

    /// Build a connection over already-open handles.
    pub fn from_parts(
        device: &str,
        writer: Box<dyn Write + Send>,
        reader_io: Box<dyn Read + Send>,
        settings: &SerialSettings,
        queue: Sender<String>,
    ) -> Result<Self, PanelError> {
        let reader = reader::spawn(reader_io, queue, settings.join_timeout()).map_err(|source| {
            PanelError::Connection { device: device.to_string(), source }
        })?;
        Ok(Self {
            device: device.to_string(),
            writer,
            reader: Some(reader),
        })
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Write one command line. The newline is appended here.
    pub fn write_line(&mut self, text: &str) -> Result<(), PanelError> {
        debug!(target: "transport", "→ {}", text);
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.writer.write_all(line.as_bytes()).map_err(PanelError::Write)?;
        self.writer.flush().map_err(PanelError::Write)
    }

    /// Stop the listener and release the port. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(mut reader) = self.reader.take() {
            if !reader.stop() {
                warn!(target: "transport", "Listener on {} did not stop in time; abandoned", self.device);
            }
            // Best effort; the port is closed when the handles drop
            let _ = self.writer.flush();
            info!(target: "transport", "Closed {}", self.device);
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// At most one connection is live at a time.
#[derive(Debug, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connected(Connection),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected(_))
    }

    pub fn device(&self) -> Option<&str> {
        match self {
            ConnectionState::Connected(c) => Some(c.device()),
            ConnectionState::Disconnected => None,
        }
    }
}
