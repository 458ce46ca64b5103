//! Per-session virtual process state and the capability view commands see.

use std::collections::HashMap;
use std::io::{Read, Write};

use decoy_types::error::{DecoyError, Result};
use decoy_vfs::Vfs;

use crate::term::CrlfWriter;

/// A stream that can be both read and written.
pub trait ReadWrite: Read + Write {}

impl<T: Read + Write + ?Sized> ReadWrite for T {}

/// The byte streams of one remote session.
///
/// Implemented by the transport (an SSH channel, a console, a test harness).
/// `error` is the stderr-equivalent channel, which some transports also
/// accept reads from.
pub trait SessionIo {
    fn input(&mut self) -> &mut dyn Read;
    fn output(&mut self) -> &mut dyn Write;
    fn error(&mut self) -> &mut dyn ReadWrite;
}

/// Operations a command may perform on the process it runs in.
///
/// Commands receive `&mut dyn ProcessEnv` and never the concrete context, so
/// the dispatcher can hand them either a session's [`VirtualProcess`] or a
/// decorated view of it.
pub trait ProcessEnv {
    /// Current working directory.
    fn getcwd(&self) -> &str;

    /// Change the working directory. Relative paths are appended to the
    /// current one as given; `.` and `..` are left for the filesystem to
    /// resolve.
    fn chdir(&mut self, path: &str) -> Result<()>;

    /// Standard input.
    fn stdin(&mut self) -> &mut dyn Read;

    /// Standard output, with line feeds translated for the terminal.
    fn stdout(&mut self) -> CrlfWriter<&mut dyn Write>;

    /// Standard error.
    fn stderr(&mut self) -> &mut dyn ReadWrite;

    /// Environment as `KEY=VALUE` strings, in no particular order.
    fn environ(&self) -> Vec<String>;

    /// Set or replace an environment variable.
    fn set_env(&mut self, key: &str, value: &str) -> Result<()>;

    /// The session's virtual filesystem.
    fn fs(&mut self) -> &mut dyn Vfs;

    /// Terminal columns.
    fn width(&self) -> u32;

    /// Terminal rows.
    fn height(&self) -> u32;
}

/// The process context a session's commands execute against.
///
/// Owned by exactly one session. Commands run one at a time through
/// `&mut` borrows, so nothing here is locked.
pub struct VirtualProcess {
    cwd: String,
    env: HashMap<String, String>,
    fs: Box<dyn Vfs + Send>,
    io: Box<dyn SessionIo + Send>,
    width: u32,
    height: u32,
    session: String,
}

impl VirtualProcess {
    /// Start a process in `home`, creating the directory if it is missing.
    ///
    /// `session` labels this process in log records.
    pub fn new(
        session: impl Into<String>,
        home: &str,
        mut fs: Box<dyn Vfs + Send>,
        io: Box<dyn SessionIo + Send>,
        width: u32,
        height: u32,
    ) -> Result<Self> {
        if !home.starts_with('/') {
            return Err(DecoyError::Vfs(format!(
                "home directory must be absolute: {home}"
            )));
        }
        if !fs.dir_exists(home)? {
            fs.mkdir(home)?;
        }
        let session = session.into();
        log::debug!("Session {session} starting in {home} ({width}x{height})");
        Ok(Self {
            cwd: home.to_string(),
            env: HashMap::new(),
            fs,
            io,
            width,
            height,
            session,
        })
    }

    /// Seed the environment.
    pub fn with_env<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Value of one environment variable.
    pub fn getenv(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    /// Label used in log records for this session.
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Unwrapped session output, without line-feed translation.
    pub fn raw_output(&mut self) -> &mut dyn Write {
        self.io.output()
    }
}

impl ProcessEnv for VirtualProcess {
    fn getcwd(&self) -> &str {
        &self.cwd
    }

    fn chdir(&mut self, path: &str) -> Result<()> {
        let target = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{path}", self.cwd)
        };
        if !self.fs.dir_exists(&target)? {
            return Err(DecoyError::not_found("chdir", target));
        }
        self.cwd = target;
        Ok(())
    }

    fn stdin(&mut self) -> &mut dyn Read {
        self.io.input()
    }

    fn stdout(&mut self) -> CrlfWriter<&mut dyn Write> {
        CrlfWriter::new(self.io.output())
    }

    fn stderr(&mut self) -> &mut dyn ReadWrite {
        self.io.error()
    }

    fn environ(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    fn set_env(&mut self, key: &str, value: &str) -> Result<()> {
        self.env.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn fs(&mut self) -> &mut dyn Vfs {
        &mut *self.fs
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
