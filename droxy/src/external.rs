//! External command execution handler.

use droxy_builtin::process;
use droxy_types::ProxySettings;
use tracing::debug;

/// Variables layered over the inherited environment: each proxy key in
/// lower- and upper-case. Empty settings add nothing.
pub fn proxy_env(proxies: &ProxySettings) -> Vec<(String, String)> {
    proxies.env_vars()
}

/// Execute an external command.
///
/// This is the fallback handler when no builtin command matches. Returns
/// the child's exit status unchanged, or 127/126 when it cannot be spawned.
pub fn execute(cmd: &str, args: Vec<String>, proxies: &ProxySettings) -> i32 {
    debug!("Dispatching external command: {} {:?}", cmd, args);

    let program = process::resolve_program(cmd);
    let envs = proxy_env(proxies);
    match process::run(&program, &args, &envs) {
        Ok(code) => code,
        Err(err) => process::report_failure(&err),
    }
}
