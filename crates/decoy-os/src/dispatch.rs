//! Command dispatch with crash containment.
//!
//! The dispatcher resolves an executable path to a registered command and
//! runs it against a session's [`VirtualProcess`]. A command that panics
//! must never take the session (or the host) down with it: the panic is
//! caught at this boundary, logged, and shown to the attacker as an
//! ordinary segfault.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use decoy_types::error::{DecoyError, Result};

use crate::process::{ProcessEnv, ReadWrite, VirtualProcess};
use crate::redirect::Redirected;
use crate::registry::CommandRegistry;

/// Exit status reported for a command that crashed (128 + SIGSEGV).
pub const EXIT_CRASHED: i32 = 139;

/// Line written to the session's stderr when a command crashes.
const CRASH_MESSAGE: &[u8] = b"Segmentation fault\n";

/// Runs commands from a shared registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Run the executable at `path` with `args` against `process`.
    ///
    /// Only the last path component selects the command. Unknown commands
    /// give `DecoyError::NotFound` (exit status 127). A crashing command
    /// yields `Ok(EXIT_CRASHED)`.
    pub fn exec(&self, process: &mut VirtualProcess, path: &str, args: &[&str]) -> Result<i32> {
        self.run(process, path, args, None)
    }

    /// Like [`Dispatcher::exec`], but the command's stdin, stdout and stderr
    /// are all bound to `observer`.
    pub fn exec_observed(
        &self,
        process: &mut VirtualProcess,
        path: &str,
        args: &[&str],
        observer: &mut dyn ReadWrite,
    ) -> Result<i32> {
        self.run(process, path, args, Some(observer))
    }

    fn run(
        &self,
        process: &mut VirtualProcess,
        path: &str,
        args: &[&str],
        observer: Option<&mut dyn ReadWrite>,
    ) -> Result<i32> {
        let Some(cmd) = self.registry.lookup(base_name(path)) else {
            log::debug!(session = process.session(), cmd = path; "Command not found");
            return Err(DecoyError::not_found("exec", path));
        };

        let outcome = {
            let process = &mut *process;
            panic::catch_unwind(AssertUnwindSafe(move || match observer {
                Some(observer) => cmd.exec(args, &mut Redirected::new(process, observer)),
                None => cmd.exec(args, process),
            }))
        };

        match outcome {
            Ok(code) => Ok(code),
            Err(payload) => {
                let detail = panic_message(&*payload);
                log::error!(
                    session = process.session(),
                    cmd = path,
                    args:? = args,
                    error = detail.as_str();
                    "Command has crashed"
                );
                if let Err(e) = process.stderr().write_all(CRASH_MESSAGE) {
                    log::warn!(session = process.session(); "Failed to report crash: {e}");
                }
                Ok(EXIT_CRASHED)
            },
        }
    }
}

/// Last component of `path`, ignoring trailing slashes.
///
/// An empty path gives `"."` and a path of only slashes gives `"/"`.
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Best-effort text of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
