//! Honeypot configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! usable configuration.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{DecoyError, Result};

/// Terminal geometry used when the client does not report one.
const DEFAULT_WIDTH: u32 = 80;
const DEFAULT_HEIGHT: u32 = 24;

/// Top-level configuration for a decoy shell deployment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DecoyConfig {
    /// Hostname presented to the attacker.
    pub hostname: String,
    /// Account used by the console session.
    pub default_user: String,
    /// Terminal columns.
    pub width: u32,
    /// Terminal rows.
    pub height: u32,
    /// Explicit home directories keyed by user name.
    pub homes: HashMap<String, String>,
    /// Environment every new session starts with.
    pub env: BTreeMap<String, String>,
    /// Asciicast file to record console sessions into.
    pub record_path: Option<PathBuf>,
}

impl Default for DecoyConfig {
    fn default() -> Self {
        let env = [
            ("PATH", "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin"),
            ("SHELL", "/bin/bash"),
            ("TERM", "xterm-256color"),
            ("LANG", "en_US.UTF-8"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            hostname: "svr04".to_string(),
            default_user: "root".to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            homes: HashMap::new(),
            env,
            record_path: None,
        }
    }
}

impl DecoyConfig {
    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Home directory for `user`.
    ///
    /// Explicit entries win; otherwise `root` lives in `/root` and everyone
    /// else under `/home`.
    pub fn home_dir(&self, user: &str) -> String {
        match self.homes.get(user) {
            Some(home) => home.clone(),
            None if user == "root" => "/root".to_string(),
            None => format!("/home/{user}"),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DecoyError::Config(format!(
                "terminal geometry must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.default_user.is_empty() {
            return Err(DecoyError::Config("default_user is empty".to_string()));
        }
        if let Some((user, home)) = self.homes.iter().find(|(_, h)| !h.starts_with('/')) {
            return Err(DecoyError::Config(format!(
                "home for {user} must be absolute: {home}"
            )));
        }
        Ok(())
    }
}
