//! IO redirection around a virtual process.

use std::io::{Read, Write};

use decoy_types::error::Result;
use decoy_vfs::Vfs;

use crate::process::{ProcessEnv, ReadWrite, VirtualProcess};
use crate::term::CrlfWriter;

/// A view of a [`VirtualProcess`] whose standard streams all go to an
/// observer, typically a session recorder.
///
/// Working directory, environment, filesystem and geometry are the wrapped
/// process's own, so changes a command makes through this view outlive it.
pub struct Redirected<'a> {
    process: &'a mut VirtualProcess,
    observer: &'a mut dyn ReadWrite,
}

impl<'a> Redirected<'a> {
    pub fn new(process: &'a mut VirtualProcess, observer: &'a mut dyn ReadWrite) -> Self {
        Self { process, observer }
    }
}

impl ProcessEnv for Redirected<'_> {
    fn getcwd(&self) -> &str {
        self.process.getcwd()
    }

    fn chdir(&mut self, path: &str) -> Result<()> {
        self.process.chdir(path)
    }

    fn stdin(&mut self) -> &mut dyn Read {
        &mut *self.observer
    }

    fn stdout(&mut self) -> CrlfWriter<&mut dyn Write> {
        let out: &mut dyn Write = &mut *self.observer;
        CrlfWriter::new(out)
    }

    fn stderr(&mut self) -> &mut dyn ReadWrite {
        &mut *self.observer
    }

    fn environ(&self) -> Vec<String> {
        self.process.environ()
    }

    fn set_env(&mut self, key: &str, value: &str) -> Result<()> {
        self.process.set_env(key, value)
    }

    fn fs(&mut self) -> &mut dyn Vfs {
        self.process.fs()
    }

    fn width(&self) -> u32 {
        self.process.width()
    }

    fn height(&self) -> u32 {
        self.process.height()
    }
}
