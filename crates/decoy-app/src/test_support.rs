//! Shared fixtures for the app's unit tests.

use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use decoy_os::{ReadWrite, SessionIo, VirtualProcess};
use decoy_vfs::{MemoryVfs, Vfs};

/// Clonable in-memory byte sink.
#[derive(Clone, Default)]
pub struct Buffer(Arc<Mutex<Vec<u8>>>);

impl Buffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Buffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for Buffer {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Ok(0)
    }
}

struct Streams {
    input: Cursor<Vec<u8>>,
    output: Buffer,
    error: Buffer,
}

impl SessionIo for Streams {
    fn input(&mut self) -> &mut dyn Read {
        &mut self.input
    }
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }
    fn error(&mut self) -> &mut dyn ReadWrite {
        &mut self.error
    }
}

/// A process plus handles on everything it writes.
pub struct Captured {
    pub process: VirtualProcess,
    pub output: Buffer,
    pub error: Buffer,
}

/// A root session in `/root` with `/etc/hostname` present, reading `stdin`.
pub fn make_session(stdin: &[u8]) -> Captured {
    let output = Buffer::default();
    let error = Buffer::default();
    let streams = Streams {
        input: Cursor::new(stdin.to_vec()),
        output: output.clone(),
        error: error.clone(),
    };
    let mut vfs = MemoryVfs::with_dirs(["/etc", "/tmp"]).unwrap();
    vfs.write("/etc/hostname", b"svr04\n").unwrap();
    let process = VirtualProcess::new("test", "/root", Box::new(vfs), Box::new(streams), 80, 24)
        .unwrap()
        .with_env([("HOME", "/root")]);
    Captured {
        process,
        output,
        error,
    }
}
