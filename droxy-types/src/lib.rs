use std::path::PathBuf;
use thiserror::Error;

pub mod proxy;
pub use proxy::ProxySettings;

/// Name droxy answers to when invoked directly rather than through a symlink.
pub const APP_NAME: &str = "droxy";

/// Exit code used when no configuration file exists in any search location.
pub const EXIT_CONFIG_NOT_FOUND: i32 = 105;

/// Exit code for a command that could not be found.
pub const EXIT_COMMAND_NOT_FOUND: i32 = 127;

/// Exit code for a command that was found but could not be executed.
pub const EXIT_COMMAND_NOT_EXECUTABLE: i32 = 126;

/// Droxy specific error types
#[derive(Error, Debug)]
pub enum DroxyError {
    #[error("config file not found; searched:\n{}", format_paths(.searched))]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("failed to load config {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("failed to execute '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("git config failed: {message}")]
    GitConfig { message: String },

    #[error("Lock operation failed: {0}")]
    Lock(String),
}

impl DroxyError {
    /// Process exit code this error maps to when it reaches `main`.
    pub fn exit_code(&self) -> i32 {
        match self {
            DroxyError::ConfigNotFound { .. } => EXIT_CONFIG_NOT_FOUND,
            DroxyError::Spawn { source, .. }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                EXIT_COMMAND_NOT_FOUND
            }
            DroxyError::Spawn { .. } => EXIT_COMMAND_NOT_EXECUTABLE,
            _ => 1,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type DroxyResult<T> = std::result::Result<T, DroxyError>;
