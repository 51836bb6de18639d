//! CLI for ssacli-exporter: HPE Smart Array drive health for Prometheus.

mod commands;

use std::ffi::OsString;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use ssacli_exporter_core::config::DEFAULT_SHELL;
use ssacli_exporter_core::{DEFAULT_COMMAND, DEFAULT_PORT, DEFAULT_PROBING_RATE, parse_duration};

#[derive(Parser)]
#[command(name = "ssacli-exporter")]
#[command(about = "ssacli-exporter: HPE Smart Array physical drive metrics for Prometheus")]
#[command(version = ssacli_exporter_core::VERSION)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Options used when no subcommand is given (same as `serve`)
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe ssacli periodically and serve the results on /metrics (default)
    Serve(ServeArgs),

    /// Parse a saved `show detail` report once and print the metrics
    Parse {
        /// Report file, or "-" for stdin
        #[arg(default_value = "-")]
        path: String,
    },
}

#[derive(Args, Clone, Debug)]
struct ServeArgs {
    /// Port to listen on
    #[arg(long, alias = "Port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// How often ssacli is probed for new values (e.g. "30s", "1m", "1m30s")
    #[arg(long, alias = "ProbingRate", default_value = DEFAULT_PROBING_RATE, value_parser = parse_duration)]
    probing_rate: Duration,

    /// Diagnostic command to run on every probe
    #[arg(long = "command", default_value = DEFAULT_COMMAND)]
    probe_command: String,

    /// Shell used to run the command (invoked as `<shell> -c <command>`)
    #[arg(long, default_value = DEFAULT_SHELL)]
    shell: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));

    match cli.command {
        Some(Commands::Serve(args)) => commands::serve::run(args.into()),
        Some(Commands::Parse { path }) => commands::parse::run(&path),
        None => commands::serve::run(cli.serve.into()),
    }
}

/// Flags of the older exporter, which took Go-style single-dash long flags.
const LEGACY_FLAGS: &[&str] = &["Port", "ProbingRate"];

/// Rewrite `-Port 9109` / `-ProbingRate=30s` into their `--` forms.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let is_legacy = arg
                .to_str()
                .and_then(|a| a.strip_prefix('-'))
                .map(|flag| flag.split_once('=').map_or(flag, |(name, _)| name))
                .is_some_and(|name| LEGACY_FLAGS.contains(&name));
            if is_legacy {
                OsString::from(format!("-{}", arg.to_string_lossy()))
            } else {
                arg
            }
        })
        .collect()
}

impl From<ServeArgs> for commands::serve::ServeConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            probe: ssacli_exporter_core::ProbeConfig {
                command: args.probe_command,
                shell: args.shell,
                interval: args.probing_rate,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_arguments_serves_with_defaults() {
        let cli = Cli::try_parse_from(["ssacli-exporter"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.serve.port, 9109);
        assert_eq!(cli.serve.probing_rate, Duration::from_secs(60));
        assert_eq!(cli.serve.probe_command, DEFAULT_COMMAND);
        assert_eq!(cli.serve.shell, "bash");
        assert_eq!(cli.serve.host, "0.0.0.0");
    }

    fn parse_args(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(normalize_legacy_flags(args.iter().map(OsString::from)))
    }

    #[test]
    fn double_dash_legacy_names_are_accepted() {
        let cli =
            parse_args(&["ssacli-exporter", "--Port", "9200", "--ProbingRate", "30s"]).unwrap();
        assert_eq!(cli.serve.port, 9200);
        assert_eq!(cli.serve.probing_rate, Duration::from_secs(30));
    }

    #[test]
    fn single_dash_legacy_names_are_accepted() {
        let cli =
            parse_args(&["ssacli-exporter", "-Port", "9200", "-ProbingRate=1m30s"]).unwrap();
        assert_eq!(cli.serve.port, 9200);
        assert_eq!(cli.serve.probing_rate, Duration::from_secs(90));
    }

    #[test]
    fn normalize_leaves_other_arguments_alone() {
        let args = ["ssacli-exporter", "parse", "-", "--port", "-Portable"];
        let normalized = normalize_legacy_flags(args.iter().map(OsString::from));
        assert_eq!(normalized, args.map(OsString::from).to_vec());

        let args = ["ssacli-exporter", "--Port", "1", "-Port=2"];
        let normalized = normalize_legacy_flags(args.iter().map(OsString::from));
        assert_eq!(normalized[1], "--Port");
        assert_eq!(normalized[3], "--Port=2");
    }

    #[test]
    fn serve_subcommand_takes_same_options() {
        let cli = Cli::try_parse_from([
            "ssacli-exporter",
            "serve",
            "--probing-rate",
            "1m30s",
            "--command",
            "cat /tmp/report.txt",
            "--shell",
            "sh",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Serve(args)) => {
                let config: commands::serve::ServeConfig = args.into();
                assert_eq!(config.probe.interval, Duration::from_secs(90));
                assert_eq!(config.probe.command, "cat /tmp/report.txt");
                assert_eq!(config.probe.shell, "sh");
                assert_eq!(config.port, 9109);
            }
            _ => panic!("expected serve subcommand"),
        }
    }

    #[test]
    fn invalid_probing_rate_is_rejected() {
        assert!(Cli::try_parse_from(["ssacli-exporter", "--probing-rate", "often"]).is_err());
        assert!(Cli::try_parse_from(["ssacli-exporter", "--probing-rate", "0s"]).is_err());
    }

    #[test]
    fn parse_defaults_to_stdin() {
        let cli = Cli::try_parse_from(["ssacli-exporter", "parse"]).unwrap();
        match cli.command {
            Some(Commands::Parse { path }) => assert_eq!(path, "-"),
            _ => panic!("expected parse subcommand"),
        }
    }
}
