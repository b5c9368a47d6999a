use anyhow::Result;
use clap::{CommandFactory, FromArgMatches, Parser};
use droxy::{CommandProbe, ConfigStore, Dispatcher, LOG_ENV};
use droxy_builtin::BuiltinRegistry;
use droxy_types::{APP_NAME, DroxyError};
use std::path::Path;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Command to run with the current network's proxy, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    argv: Vec<String>,
}

fn main() -> ExitCode {
    if let Err(err) = init_tracing() {
        eprintln!("Failed to initialize tracing: {err}");
        return ExitCode::FAILURE;
    }

    let registry = BuiltinRegistry::new();

    // Installed as a symlink named after another command: every argument
    // belongs to that command, so clap must not see them.
    let (cmd, args): (String, Vec<String>) = match invoked_as() {
        Some(name) => {
            debug!("invoked as {name}");
            (name, std::env::args().skip(1).collect())
        }
        None => {
            let mut argv = parse_cli(&registry).argv.into_iter();
            let Some(cmd) = argv.next() else {
                println!("{}", droxy::banner());
                return ExitCode::SUCCESS;
            };
            (cmd, argv.collect())
        }
    };

    match run(registry, &cmd, args) {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("{APP_NAME}: {err:#}");
            let code = err
                .downcast_ref::<DroxyError>()
                .map(DroxyError::exit_code)
                .unwrap_or(1);
            exit_code(code)
        }
    }
}

fn parse_cli(registry: &BuiltinRegistry) -> Cli {
    let matches = Cli::command()
        .after_help(droxy::builtin_help(registry))
        .get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

fn run(registry: BuiltinRegistry, cmd: &str, args: Vec<String>) -> Result<i32> {
    let store = ConfigStore::load()?;
    debug!(
        "loaded {} networks from {}",
        store.networks().count(),
        store.path().display()
    );

    let dispatcher = Dispatcher::new(registry, store, CommandProbe::from_env());
    Ok(dispatcher.dispatch(cmd, args))
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}

/// The command name when droxy is run through a symlink under another name.
fn invoked_as() -> Option<String> {
    let arg0 = std::env::args_os().next()?;
    let name = Path::new(&arg0).file_name()?.to_str()?;
    if name == APP_NAME {
        None
    } else {
        Some(name.to_string())
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(status_byte(code))
}

fn status_byte(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_arguments_are_not_parsed() {
        let cli = Cli::try_parse_from(["droxy", "git", "--version", "-c", "x=y"]).unwrap();
        assert_eq!(cli.argv, vec!["git", "--version", "-c", "x=y"]);
    }

    #[test]
    fn no_arguments_is_empty() {
        let cli = Cli::try_parse_from(["droxy"]).unwrap();
        assert!(cli.argv.is_empty());
    }

    #[test]
    fn help_lists_builtins() {
        let help = Cli::command()
            .after_help(droxy::builtin_help(&BuiltinRegistry::new()))
            .render_long_help()
            .to_string();
        assert!(help.contains("Builtin commands:"), "{help}");
        assert!(help.contains("proxy-env"), "{help}");
    }

    #[test]
    fn exit_codes_fit_u8() {
        assert_eq!(status_byte(0), 0);
        assert_eq!(status_byte(105), 105);
        assert_eq!(status_byte(-1), 1);
        assert_eq!(status_byte(300), 1);
    }
}
