mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "xbeelink", version, about = "XBee radio command-line client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_subcommand() {
        let cli = Cli::try_parse_from([
            "xbeelink",
            "local",
            "--port",
            "/dev/ttyUSB0",
            "NI",
            "--param",
            "kitchen",
        ])
        .expect("local args should parse");

        assert!(matches!(cli.command, Command::Local(_)));
    }

    #[test]
    fn rejects_two_destinations() {
        let err = Cli::try_parse_from([
            "xbeelink",
            "remote",
            "--port",
            "/dev/ttyUSB0",
            "D0",
            "--node-id",
            "PUMP",
            "--dest16",
            "1234",
        ])
        .expect_err("conflicting destinations should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn requires_a_destination() {
        let err = Cli::try_parse_from([
            "xbeelink",
            "transmit",
            "--port",
            "/dev/ttyUSB0",
            "--data",
            "hi",
        ])
        .expect_err("missing destination should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn parses_module_names() {
        let cli = Cli::try_parse_from([
            "xbeelink",
            "discover",
            "--port",
            "/dev/ttyUSB0",
            "--module",
            "802.15.4",
            "--window",
            "3s",
        ])
        .expect("discover args should parse");

        match cli.command {
            Command::Discover(args) => {
                assert_eq!(args.link.module, xbeelink_session::ModuleKind::Series1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
