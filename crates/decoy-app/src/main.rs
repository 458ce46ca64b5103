//! Decoy console entry point.
//!
//! Runs one emulated shell session against the local terminal. The config
//! file comes from the first argument or `DECOY_CONFIG`; defaults apply when
//! neither is given.

mod commands;
mod console;
mod recorder;
mod shell;
#[cfg(test)]
mod test_support;
mod vfs_setup;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use console::{ConsoleIo, Terminal};
use decoy_os::{Dispatcher, RegistryBuilder, VirtualProcess};
use decoy_types::config::DecoyConfig;
use decoy_vfs::MemoryVfs;
use recorder::Recorder;
use shell::Shell;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_FILTER: log::LevelFilter = log::LevelFilter::Info;

/// Level panic reports are logged at. Must pass [`DEFAULT_FILTER`].
const PANIC_LEVEL: log::Level = log::Level::Error;

fn main() -> Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(DEFAULT_FILTER.as_str()),
    )
    .init();

    // Panics go through the logger instead of being printed into the session.
    std::panic::set_hook(Box::new(|info| {
        log::log!(PANIC_LEVEL, "{info}");
    }));

    let config = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DECOY_CONFIG").ok())
    {
        Some(path) => {
            let path = PathBuf::from(path);
            DecoyConfig::load(&path)
                .with_context(|| format!("loading config {}", path.display()))?
        },
        None => DecoyConfig::default(),
    };
    log::info!(
        "Starting decoy {} as {} ({}x{})",
        config.hostname,
        config.default_user,
        config.width,
        config.height,
    );

    let mut builder = RegistryBuilder::new();
    commands::register_commands(&mut builder, &config);
    let dispatcher = Dispatcher::new(Arc::new(builder.build()));

    let mut vfs = MemoryVfs::new();
    vfs_setup::populate_decoy_vfs(&mut vfs, &config).context("populating filesystem")?;

    let home = config.home_dir(&config.default_user);
    let process = VirtualProcess::new(
        "console",
        &home,
        Box::new(vfs),
        Box::new(ConsoleIo::new()),
        config.width,
        config.height,
    )?
    .with_env(config.env.clone())
    .with_env([
        ("HOME", home.as_str()),
        ("USER", config.default_user.as_str()),
        ("LOGNAME", config.default_user.as_str()),
        ("PWD", home.as_str()),
    ]);

    let mut shell = Shell::new(dispatcher, process, &config.hostname, &config.default_user);
    if let Some(path) = &config.record_path {
        let cast = File::create(path)
            .with_context(|| format!("creating recording {}", path.display()))?;
        let term = config.env.get("TERM").map_or("xterm", String::as_str);
        let recorder = Recorder::new(
            Terminal::new(),
            BufWriter::new(cast),
            config.width,
            config.height,
            term,
        )?;
        log::info!("Recording session to {}", path.display());
        shell = shell.with_recorder(Box::new(recorder));
    }

    let status = shell.run()?;
    log::info!("Session ended with status {status}");
    Ok(())
}
