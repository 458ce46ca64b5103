//! Virtual process layer of the decoy shell.
//!
//! Simulated executables implement [`Command`] and are collected in a
//! [`CommandRegistry`] at startup. Each session owns a [`VirtualProcess`]
//! (working directory, environment, filesystem, terminal streams) and runs
//! commands through a [`Dispatcher`], which hands them only the
//! [`ProcessEnv`] capability view and turns crashes into fake segfaults.

mod command;
mod dispatch;
mod process;
mod redirect;
mod registry;
mod term;

/// A simulated executable.
pub use command::Command;
/// Crash-contained command execution.
pub use dispatch::{Dispatcher, EXIT_CRASHED, base_name};
/// Session context, its capability view, and the session stream traits.
pub use process::{ProcessEnv, ReadWrite, SessionIo, VirtualProcess};
/// Process view with standard streams bound to an observer.
pub use redirect::Redirected;
/// Command table and its builder.
pub use registry::{CommandRegistry, RegistryBuilder};
/// Line-feed translating writer for terminal output.
pub use term::CrlfWriter;
/// Exit status for an unknown executable.
pub use decoy_types::error::EXIT_NOT_FOUND;
