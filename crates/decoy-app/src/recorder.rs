//! Session capture in asciicast v2 format.
//!
//! The recorder sits between a command and the terminal: everything passes
//! through unchanged and is also appended to the cast file as timed events.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

#[derive(Debug, Serialize)]
struct Header<'a> {
    version: u8,
    width: u32,
    height: u32,
    timestamp: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<&'a str, &'a str>,
}

/// Tees a terminal stream into an asciicast recording.
pub struct Recorder<T, S> {
    terminal: T,
    cast: S,
    started: Instant,
}

impl<T: Read + Write, S: Write> Recorder<T, S> {
    /// Write the cast header and start the clock.
    pub fn new(terminal: T, mut cast: S, width: u32, height: u32, term: &str) -> io::Result<Self> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let header = Header {
            version: 2,
            width,
            height,
            timestamp,
            env: BTreeMap::from([("TERM", term)]),
        };
        serde_json::to_writer(&mut cast, &header)?;
        cast.write_all(b"\n")?;
        Ok(Self {
            terminal,
            cast,
            started: Instant::now(),
        })
    }

    /// Append one event of kind `"o"` (output) or `"i"` (input).
    fn event(&mut self, kind: &str, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let text = String::from_utf8_lossy(data);
        serde_json::to_writer(&mut self.cast, &(elapsed, kind, text.as_ref()))?;
        self.cast.write_all(b"\n")
    }

    #[cfg(test)]
    fn into_parts(self) -> (T, S) {
        (self.terminal, self.cast)
    }
}

impl<T: Read + Write, S: Write> Read for Recorder<T, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.terminal.read(buf)?;
        if let Err(e) = self.event("i", &buf[..n]) {
            log::warn!("Recording input failed: {e}");
        }
        Ok(n)
    }
}

impl<T: Read + Write, S: Write> Write for Recorder<T, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.terminal.write(buf)?;
        if let Err(e) = self.event("o", &buf[..n]) {
            log::warn!("Recording output failed: {e}");
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.terminal.flush()?;
        self.cast.flush()
    }
}
