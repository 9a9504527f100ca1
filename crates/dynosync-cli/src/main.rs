//! dynosync - keeps a dyno's session alive across restarts.
//!
//! Runs alongside the bot process, watching its credential file and
//! mirroring it into an app config var so the next dyno boots logged in.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Directory for daily-rolling log files, if set.
const LOG_DIR_VAR: &str = "DYNOSYNC_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard must be held for the life of the process or buffered
/// file output is lost.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_VAR) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "dynosync.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

struct Args {
    command: Command,
    config_path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut command = None;
    let mut config_path = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => match iter.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("--config requires a path"),
            },
            other if command.is_none() => command = Some(Command::parse(other)?),
            other => bail!("Unexpected argument: {}", other),
        }
    }

    Ok(Args {
        command: command.unwrap_or(Command::Run),
        config_path,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let args = parse_args(&argv)?;

    let _log_guard = init_tracing();
    info!(command = ?args.command, "dynosync starting");

    commands::run(args.command, args.config_path.as_deref()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_to_run() {
        let args = parse_args(&[]).unwrap();
        assert_eq!(args.command, Command::Run);
        assert!(args.config_path.is_none());
    }

    #[test]
    fn test_command_and_config_in_any_order() {
        let args = parse_args(&strings(&["--config", "/tmp/c.json", "save"])).unwrap();
        assert_eq!(args.command, Command::Save);
        assert_eq!(args.config_path, Some(PathBuf::from("/tmp/c.json")));

        let args = parse_args(&strings(&["status", "-c", "x.json"])).unwrap();
        assert_eq!(args.command, Command::Status);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(parse_args(&strings(&["--config"])).is_err());
        assert!(parse_args(&strings(&["frobnicate"])).is_err());
        assert!(parse_args(&strings(&["save", "restore"])).is_err());
    }
}
