//! Current wireless network lookup.

use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Environment variable overriding the platform SSID probe command.
pub const SSID_COMMAND_ENV: &str = "DROXY_SSID_COMMAND";

/// Source of the SSID the machine is currently associated with.
pub trait SsidProbe {
    /// `None` when the SSID could not be determined. An empty string means
    /// the probe ran fine but reported no network.
    fn current_ssid(&self) -> Option<String>;
}

/// Probe that runs an external command and reads the SSID from its stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
    prefix: Option<&'static str>,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            prefix: None,
        }
    }

    /// Use `$DROXY_SSID_COMMAND` when set, otherwise the platform default.
    pub fn from_env() -> Self {
        match std::env::var(SSID_COMMAND_ENV) {
            Ok(line) if !line.trim().is_empty() => match Self::from_command_line(&line) {
                Some(probe) => probe,
                None => {
                    warn!("invalid {SSID_COMMAND_ENV} {line:?}; using default probe");
                    Self::platform_default()
                }
            },
            _ => Self::platform_default(),
        }
    }

    /// Build a probe from a shell-style command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut words = shell_words::split(line).ok()?.into_iter();
        let program = words.next()?;
        Some(Self::new(program, words.collect()))
    }

    pub fn platform_default() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_os = "macos")] {
                Self {
                    program: "networksetup".to_string(),
                    args: vec!["-getairportnetwork".to_string(), "en0".to_string()],
                    prefix: Some("Current Wi-Fi Network:"),
                }
            } else {
                Self::new("iwgetid", vec!["-r".to_string()])
            }
        }
    }
}

impl SsidProbe for CommandProbe {
    fn current_ssid(&self) -> Option<String> {
        let output = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                debug!("ssid probe {} failed to start: {err}", self.program);
                return None;
            }
        };

        if !output.status.success() {
            debug!("ssid probe {} exited with {}", self.program, output.status);
            return None;
        }

        let ssid = decode_ssid(&output.stdout, self.prefix);
        debug!("current ssid {ssid:?}");
        Some(ssid)
    }
}

/// Trimmed probe output. Output that is not valid UTF-8 counts as no SSID.
fn decode_ssid(stdout: &[u8], prefix: Option<&str>) -> String {
    let Ok(text) = std::str::from_utf8(stdout) else {
        debug!("ssid probe output is not UTF-8");
        return String::new();
    };
    let text = text.trim();
    match prefix.and_then(|p| text.strip_prefix(p)) {
        Some(rest) => rest.trim().to_string(),
        None => text.to_string(),
    }
}
