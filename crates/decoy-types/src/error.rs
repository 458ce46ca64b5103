//! Error types for the decoy shell.

use std::io;

/// Shell status reported for an executable that cannot be resolved.
pub const EXIT_NOT_FOUND: i32 = 127;

/// Errors produced by the decoy shell.
#[derive(Debug, thiserror::Error)]
pub enum DecoyError {
    /// A path or executable does not exist.
    #[error("{op} {path}: no such file or directory")]
    NotFound { op: &'static str, path: String },

    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl DecoyError {
    /// Build a [`DecoyError::NotFound`] for `op` on `path`.
    pub fn not_found(op: &'static str, path: impl Into<String>) -> Self {
        Self::NotFound {
            op,
            path: path.into(),
        }
    }

    /// Whether this error means the target does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Exit status a shell reports for this failure.
    pub fn exit_status(&self) -> i32 {
        match self {
            Self::NotFound { op: "exec", .. } => EXIT_NOT_FOUND,
            _ => 1,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DecoyError>;
