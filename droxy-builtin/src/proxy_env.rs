use droxy_types::ProxySettings;
use std::io::Write;

/// Built-in proxy-env command description
pub fn description() -> &'static str {
    "Print export statements for the current network's proxy"
}

/// Built-in proxy-env command implementation
/// Intended for `eval "$(droxy proxy-env)"`.
pub fn command(args: Vec<String>, proxies: &ProxySettings) -> i32 {
    if !args.is_empty() {
        eprintln!("usage: droxy proxy-env");
        return 2;
    }

    let mut stdout = std::io::stdout().lock();
    for line in export_lines(proxies) {
        if writeln!(stdout, "{line}").is_err() {
            return 1;
        }
    }
    0
}

fn export_lines(proxies: &ProxySettings) -> Vec<String> {
    proxies
        .env_vars()
        .into_iter()
        .map(|(key, value)| format!("export {key}={}", shell_words::quote(&value)))
        .collect()
}
