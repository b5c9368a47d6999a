//! droxy runs a command with the proxy configured for the wireless network
//! the machine is currently connected to.

pub mod config;
pub mod dispatch;
pub mod external;
pub mod ssid;

pub use config::ConfigStore;
pub use dispatch::Dispatcher;
pub use ssid::{CommandProbe, SsidProbe};

use droxy_builtin::BuiltinRegistry;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "DROXY_LOG";

/// Identification line printed when droxy is run without a command.
pub fn banner() -> String {
    format!(
        "{} {}: run commands with the proxy for the current network",
        droxy_types::APP_NAME,
        env!("CARGO_PKG_VERSION")
    )
}

/// The "Builtin commands" section appended to `--help`.
pub fn builtin_help(registry: &BuiltinRegistry) -> String {
    let mut help = String::from("Builtin commands:");
    for name in registry.list() {
        let description = droxy_builtin::description(name).unwrap_or_default();
        help.push_str(&format!("\n  {name:<10}  {description}"));
    }
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_help_lists_each_builtin() {
        let help = builtin_help(&BuiltinRegistry::new());
        let lines: Vec<&str> = help.lines().collect();
        assert_eq!(lines[0], "Builtin commands:");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].trim_start().starts_with("git "), "{help}");
        assert!(lines[1].contains(droxy_builtin::git::description()));
        assert!(lines[2].trim_start().starts_with("proxy-env "), "{help}");
    }

    #[test]
    fn builtin_help_skips_unknown_descriptions() {
        fn noop(_args: Vec<String>, _proxies: &droxy_types::ProxySettings) -> i32 {
            0
        }
        let mut registry = BuiltinRegistry::empty();
        registry.register("dummy-cmd", noop);
        assert_eq!(builtin_help(&registry).trim_end(), "Builtin commands:\n  dummy-cmd");
    }
}
