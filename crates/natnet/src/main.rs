mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "natnet", version, about = "NatNet motion-capture client")]
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
    use natnet_wire::AssetKind;

    use super::*;

    #[test]
    fn parses_stream_subcommand() {
        let cli = Cli::try_parse_from([
            "natnet",
            "stream",
            "--server",
            "10.0.0.1",
            "--unicast",
            "--kinds",
            "rigid_body,skeleton",
            "--count",
            "3",
        ])
        .expect("stream args should parse");

        let Command::Stream(args) = cli.command else {
            panic!("stream command expected");
        };
        assert!(args.connect.unicast);
        assert_eq!(args.connect.server.to_string(), "10.0.0.1");
        assert_eq!(
            args.kinds,
            Some(vec![AssetKind::RigidBody, AssetKind::Skeleton])
        );
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = Cli::try_parse_from(["natnet", "stream", "--kinds", "teapot"])
            .expect_err("unknown kind should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from(["natnet", "send", "TimelinePlay", "--timeout", "3s"])
            .expect("send args should parse");
        assert!(matches!(cli.command, Command::Send(_)));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["natnet", "info", "--format", "json", "--log-level", "warn"])
            .expect("global flags should parse after the subcommand");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert_eq!(cli.log_level, LogLevel::Warn);
    }
}
