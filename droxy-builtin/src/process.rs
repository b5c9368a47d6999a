//! Program lookup and execution shared by the builtins and the external fallback.

use droxy_types::{DroxyError, DroxyResult};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use std::ffi::OsStr;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, warn};

const INTERRUPT_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

/// Locate `cmd` on PATH, skipping any candidate that is the running droxy
/// executable itself. This lets droxy be installed as a `git` (or any
/// other) symlink without re-invoking itself forever.
///
/// Commands containing a path separator are returned untouched, as are
/// commands that cannot be found (spawning will then report the error).
pub fn resolve_program(cmd: &str) -> PathBuf {
    if cmd.contains(MAIN_SEPARATOR) {
        return PathBuf::from(cmd);
    }

    let current = std::env::current_exe()
        .ok()
        .and_then(|p| p.canonicalize().ok());

    match which::which_all(cmd) {
        Ok(candidates) => {
            for candidate in candidates {
                if is_same_file(&candidate, current.as_deref()) {
                    debug!("skipping {} (droxy itself)", candidate.display());
                    continue;
                }
                return candidate;
            }
            PathBuf::from(cmd)
        }
        Err(err) => {
            debug!("{cmd} not found on PATH: {err}");
            PathBuf::from(cmd)
        }
    }
}

fn is_same_file(candidate: &Path, current: Option<&Path>) -> bool {
    match (candidate.canonicalize().ok(), current) {
        (Some(candidate), Some(current)) => candidate == current,
        _ => false,
    }
}

/// Convert a child's exit status into a shell style status code.
/// Signals map to `128 + signal`.
pub fn status_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}

/// Spawn `program` with `args` and extra environment variables layered over
/// the inherited environment, wait for it, and return its status code.
pub fn run<I, S>(program: &Path, args: I, envs: &[(String, String)]) -> DroxyResult<i32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!("spawning {} with {} extra env vars", program.display(), envs.len());
    let mut cmd = Command::new(program);
    cmd.args(args).envs(envs.iter().map(|(k, v)| (k, v)));
    wait(program, &mut cmd)
}

/// Like [`run`] without extra environment, for use while `shield` is held.
/// The child gets the interrupt dispositions droxy had before the shield,
/// so Ctrl-C still reaches it.
pub fn run_shielded<I, S>(program: &Path, args: I, shield: &InterruptShield) -> DroxyResult<i32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!("spawning {} with interrupts shielded", program.display());
    let mut cmd = Command::new(program);
    cmd.args(args);
    shield.restore_in_child(&mut cmd);
    wait(program, &mut cmd)
}

fn wait(program: &Path, cmd: &mut Command) -> DroxyResult<i32> {
    let status = cmd.status().map_err(|source| DroxyError::Spawn {
        command: program.display().to_string(),
        source,
    })?;
    Ok(status_code(status))
}

/// Ignores SIGINT and SIGQUIT in droxy while held, so an interrupt aimed at
/// the foreground child does not kill droxy before its own cleanup runs.
/// The previous dispositions are put back on drop.
pub struct InterruptShield {
    previous: Vec<(Signal, SigAction)>,
}

impl InterruptShield {
    pub fn install() -> Self {
        let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
        let mut previous = Vec::with_capacity(INTERRUPT_SIGNALS.len());
        for signal in INTERRUPT_SIGNALS {
            // SAFETY: SIG_IGN installs no handler code
            match unsafe { sigaction(signal, &ignore) } {
                Ok(old) => previous.push((signal, old)),
                Err(err) => warn!("failed to ignore {signal}: {err}"),
            }
        }
        Self { previous }
    }

    fn restore_in_child(&self, cmd: &mut Command) {
        let previous = self.previous.clone();
        // SAFETY: only sigaction runs between fork and exec, and it is
        // async-signal-safe; `previous` is allocated before the fork.
        unsafe {
            cmd.pre_exec(move || {
                for (signal, action) in &previous {
                    sigaction(*signal, action)?;
                }
                Ok(())
            });
        }
    }
}

impl Drop for InterruptShield {
    fn drop(&mut self) {
        for (signal, action) in &self.previous {
            // SAFETY: restores a disposition previously returned by sigaction
            if let Err(err) = unsafe { sigaction(*signal, action) } {
                warn!("failed to restore {signal}: {err}");
            }
        }
    }
}

/// Print a spawn failure the way a shell would and return its status code.
pub fn report_failure(err: &DroxyError) -> i32 {
    eprintln!("droxy: {err}");
    err.exit_code()
}
