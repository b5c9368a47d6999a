use droxy_types::ProxySettings;
use std::collections::HashMap;
use tracing::debug;

// Builtin command modules
pub mod git;
pub mod process;
mod proxy_env;

/// Type alias for builtin command function signature
/// All builtin commands receive the arguments following the command name and
/// the proxy settings resolved for the current network, and return a status code.
pub type BuiltinCommand = fn(args: Vec<String>, proxies: &ProxySettings) -> i32;

/// Registry of builtin commands, keyed by the exact command name.
///
/// Built once at startup and handed to the dispatcher; it is never
/// modified after construction.
pub struct BuiltinRegistry {
    commands: HashMap<String, BuiltinCommand>,
}

impl BuiltinRegistry {
    /// Create a registry with all builtin commands registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Commands that read their proxy from their own configuration
        registry.register("git", git::command);

        // Introspection
        registry.register("proxy-env", proxy_env::command);

        registry
    }

    /// Create a registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register `handler` under `name`. A later registration for the same
    /// name replaces the earlier one.
    pub fn register(&mut self, name: impl Into<String>, handler: BuiltinCommand) -> &mut Self {
        let name = name.into();
        if self.commands.insert(name.clone(), handler).is_some() {
            debug!("builtin {name} re-registered");
        }
        self
    }

    /// Get a command handler by name.
    pub fn get(&self, name: &str) -> Option<BuiltinCommand> {
        self.commands.get(name).copied()
    }

    /// List all registered builtin command names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Description of a builtin, for help output.
pub fn description(name: &str) -> Option<&'static str> {
    match name {
        "git" => Some(git::description()),
        "proxy-env" => Some(proxy_env::description()),
        _ => None,
    }
}
