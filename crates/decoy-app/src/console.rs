//! Session streams bound to the local terminal.

use std::io::{self, Read, Write};

use decoy_os::{ReadWrite, SessionIo};

/// Stdin and stdout as one read/write stream.
#[derive(Debug)]
pub struct Terminal {
    stdin: io::Stdin,
    stdout: io::Stdout,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            stdin: io::stdin(),
            stdout: io::stdout(),
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for Terminal {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stdin.read(buf)
    }
}

impl Write for Terminal {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.stdout.write(buf)?;
        self.stdout.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }
}

/// Stderr of the console. Reads always hit end of stream.
#[derive(Debug)]
struct ErrorStream(io::Stderr);

impl Read for ErrorStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

impl Write for ErrorStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// The local console acting as a session channel.
#[derive(Debug)]
pub struct ConsoleIo {
    terminal: Terminal,
    error: ErrorStream,
}

impl ConsoleIo {
    pub fn new() -> Self {
        Self {
            terminal: Terminal::new(),
            error: ErrorStream(io::stderr()),
        }
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIo for ConsoleIo {
    fn input(&mut self) -> &mut dyn Read {
        &mut self.terminal
    }

    fn output(&mut self) -> &mut dyn Write {
        &mut self.terminal
    }

    fn error(&mut self) -> &mut dyn ReadWrite {
        &mut self.error
    }
}
