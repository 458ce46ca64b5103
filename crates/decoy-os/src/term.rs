//! Terminal output adapter.

use std::io::{self, Write};

/// Rewrites every `\n` as `\r\n` on its way to the inner writer.
///
/// Remote terminals run in raw mode, so a bare line feed moves the cursor
/// down without returning it to column 0. Byte counts reported by
/// [`Write::write`] refer to the caller's buffer, not to what reached the
/// inner writer.
#[derive(Debug)]
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Report `written` bytes if any made it out, otherwise the error.
fn partial(written: usize, err: io::Error) -> io::Result<usize> {
    if written > 0 { Ok(written) } else { Err(err) }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0;
        let mut rest = buf;
        while !rest.is_empty() {
            let line_end = rest.iter().position(|&b| b == b'\n');
            let todo = line_end.unwrap_or(rest.len());

            if todo > 0 {
                match self.inner.write(&rest[..todo]) {
                    Ok(0) => {
                        return partial(written, io::ErrorKind::WriteZero.into());
                    },
                    Ok(n) => {
                        written += n;
                        rest = &rest[n..];
                        continue;
                    },
                    Err(e) => return partial(written, e),
                }
            }

            // rest[0] is the line feed.
            if let Err(e) = self.inner.write_all(b"\r\n") {
                return partial(written, e);
            }
            written += 1;
            rest = &rest[1..];
        }
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
