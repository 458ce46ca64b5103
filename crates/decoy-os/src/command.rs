//! The contract every simulated executable implements.

use crate::process::ProcessEnv;

/// A simulated executable.
///
/// Implementations read arguments, talk to the session through the given
/// [`ProcessEnv`], and return an exit status like a real program would.
/// They keep no reference to the registry and may be invoked from several
/// sessions at once.
pub trait Command: Send + Sync {
    /// Text shown for `--help` and by the shell's `help` listing.
    fn help(&self) -> &str;

    /// Run with `args` (not including the command name) and return the exit
    /// status.
    fn exec(&self, args: &[&str], env: &mut dyn ProcessEnv) -> i32;

    /// Directory the executable appears to live in, e.g. `/bin`.
    fn location(&self) -> &str {
        "/bin"
    }
}
