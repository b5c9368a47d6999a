//! `git` builtin.
//!
//! git reads its proxy from its own configuration rather than from the
//! environment, so for the duration of one invocation the proxy settings are
//! written into the global config (`https.proxy` / `http.proxy`) and removed
//! again afterwards. Removal happens in [`ProxyConfigGuard`]'s `Drop`, so it
//! also runs when git fails or the wrapped closure panics. Sections left
//! without keys are pruned so no empty `[http]` stanza is left behind.
//!
//! The whole cycle runs under an exclusive lock file so two concurrent
//! `droxy git` processes cannot unset each other's settings mid-run, and
//! with SIGINT/SIGQUIT ignored in droxy so Ctrl-C stops git but not the
//! cleanup.

use crate::process;
use droxy_types::proxy::{HTTP_PROXY, HTTPS_PROXY};
use droxy_types::{APP_NAME, DroxyError, DroxyResult, ProxySettings};
use file_lock::{FileLock, FileOptions};
use std::path::PathBuf;
use std::process::{Command, Output};
use tracing::{debug, warn};

/// (proxy key, git setting, git section)
const GIT_PROXY_SETTINGS: [(&str, &str, &str); 2] = [
    (HTTPS_PROXY, "https.proxy", "https"),
    (HTTP_PROXY, "http.proxy", "http"),
];

const LOCK_FILE: &str = "git-proxy.lock";

/// Built-in git command description
pub fn description() -> &'static str {
    "Run git with the current network's proxy in its global config"
}

/// Built-in git command implementation
pub fn command(args: Vec<String>, proxies: &ProxySettings) -> i32 {
    let shield = process::InterruptShield::install();
    let _lock = lock_git_config();
    let program = process::resolve_program("git");
    let mut config = GitCli::global(program.clone());

    with_proxy_config(&mut config, proxies, || {
        match process::run_shielded(&program, &args, &shield) {
            Ok(code) => code,
            Err(err) => process::report_failure(&err),
        }
    })
}

/// Persistent git configuration as seen by the proxy adapter.
pub trait GlobalGitConfig {
    /// Write `key = value`.
    fn set(&mut self, key: &str, value: &str) -> DroxyResult<()>;

    /// Remove `key`. Removing a key that does not exist is not an error.
    fn unset(&mut self, key: &str) -> DroxyResult<()>;

    /// Whether `section` still holds any keys.
    fn has_keys(&self, section: &str) -> DroxyResult<bool>;

    /// Remove `section` entirely.
    fn remove_section(&mut self, section: &str) -> DroxyResult<()>;
}

/// Set the proxy in `config`, run `wrapped`, then unset and prune.
///
/// Failures while setting are logged and `wrapped` still runs. Cleanup
/// always happens and its failures are logged, never returned.
pub fn with_proxy_config<C, F>(config: &mut C, proxies: &ProxySettings, wrapped: F) -> i32
where
    C: GlobalGitConfig,
    F: FnOnce() -> i32,
{
    let guard = ProxyConfigGuard::apply(config, proxies);
    let status = wrapped();
    drop(guard);
    status
}

/// Holds "proxy is set in git config"; releasing it restores the config.
pub struct ProxyConfigGuard<'a, C: GlobalGitConfig> {
    config: &'a mut C,
}

impl<'a, C: GlobalGitConfig> ProxyConfigGuard<'a, C> {
    pub fn apply(config: &'a mut C, proxies: &ProxySettings) -> Self {
        let mut guard = Self { config };
        for (key, setting, _) in GIT_PROXY_SETTINGS {
            if let Some(value) = proxies.get(key) {
                debug!("git config {setting} {value}");
                if let Err(err) = guard.config.set(setting, value) {
                    warn!("failed to set {setting}: {err}");
                }
            }
        }
        guard
    }
}

impl<C: GlobalGitConfig> Drop for ProxyConfigGuard<'_, C> {
    fn drop(&mut self) {
        for (_, setting, _) in GIT_PROXY_SETTINGS {
            if let Err(err) = self.config.unset(setting) {
                warn!("failed to unset {setting}: {err}");
            }
        }

        for (_, _, section) in GIT_PROXY_SETTINGS {
            match self.config.has_keys(section) {
                Ok(true) => debug!("keeping non-empty [{section}]"),
                Ok(false) => {
                    if let Err(err) = self.config.remove_section(section) {
                        warn!("failed to remove [{section}]: {err}");
                    }
                }
                Err(err) => warn!("failed to inspect [{section}]: {err}"),
            }
        }
    }
}

#[derive(Debug, Clone)]
enum ConfigScope {
    Global,
    File(PathBuf),
}

/// [`GlobalGitConfig`] backed by the `git config` command.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
    scope: ConfigScope,
}

impl GitCli {
    /// Operate on `git config --global`.
    pub fn global(program: PathBuf) -> Self {
        Self {
            program,
            scope: ConfigScope::Global,
        }
    }

    /// Operate on `git config --file <path>`.
    #[cfg(test)]
    fn with_file(program: PathBuf, path: PathBuf) -> Self {
        Self {
            program,
            scope: ConfigScope::File(path),
        }
    }

    /// Read `key`, `None` when unset.
    #[cfg(test)]
    fn get(&self, key: &str) -> DroxyResult<Option<String>> {
        let output = self.config(&["--get", key])?;
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim().to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(git_error("--get", key, &output)),
        }
    }

    fn config(&self, args: &[&str]) -> DroxyResult<Output> {
        let mut cmd = Command::new(&self.program);
        // stderr is matched against below
        cmd.env("LC_ALL", "C").arg("config");
        match &self.scope {
            ConfigScope::Global => {
                cmd.arg("--global");
            }
            ConfigScope::File(path) => {
                cmd.arg("--file").arg(path);
            }
        }
        cmd.args(args).output().map_err(|source| DroxyError::Spawn {
            command: self.program.display().to_string(),
            source,
        })
    }
}

fn git_error(op: &str, target: &str, output: &Output) -> DroxyError {
    DroxyError::GitConfig {
        message: format!(
            "{op} {target} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ),
    }
}

impl GlobalGitConfig for GitCli {
    fn set(&mut self, key: &str, value: &str) -> DroxyResult<()> {
        let output = self.config(&[key, value])?;
        if output.status.success() {
            Ok(())
        } else {
            Err(git_error("set", key, &output))
        }
    }

    fn unset(&mut self, key: &str) -> DroxyResult<()> {
        let output = self.config(&["--unset", key])?;
        // 5: the key was not set
        match output.status.code() {
            Some(0) | Some(5) => Ok(()),
            _ => Err(git_error("--unset", key, &output)),
        }
    }

    fn has_keys(&self, section: &str) -> DroxyResult<bool> {
        let pattern = format!("^{section}\\.");
        let output = self.config(&["--get-regexp", &pattern])?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(git_error("--get-regexp", &pattern, &output)),
        }
    }

    fn remove_section(&mut self, section: &str) -> DroxyResult<()> {
        let output = self.config(&["--remove-section", section])?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no such section") {
            debug!("[{section}] already absent");
            return Ok(());
        }
        Err(git_error("--remove-section", section, &output))
    }
}

/// Take the cross-process lock guarding the set/run/unset cycle.
/// Returns `None` (and proceeds unlocked) if the lock cannot be taken.
fn lock_git_config() -> Option<FileLock> {
    let path = match lock_path() {
        Ok(path) => path,
        Err(err) => {
            warn!("running git without config lock: {err}");
            return None;
        }
    };
    let options = FileOptions::new().write(true).create(true);
    match FileLock::lock(&path, true, options) {
        Ok(lock) => {
            debug!("locked {}", path.display());
            Some(lock)
        }
        Err(err) => {
            warn!("running git without config lock {}: {err}", path.display());
            None
        }
    }
}

fn lock_path() -> DroxyResult<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix(APP_NAME)
        .map_err(|e| DroxyError::Lock(e.to_string()))?;
    xdg_dirs
        .place_cache_file(LOCK_FILE)
        .map_err(|e| DroxyError::Lock(e.to_string()))
}
