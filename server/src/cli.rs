//! # CLI Interface
//!
//! Command-line structure for `codesync-server`, via `clap` derive. Three
//! subcommands: `run`, `challenge`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use codesync_core::config::{DEFAULT_API_PORT, DEFAULT_METRICS_PORT};

/// CodeSync ownership registry.
///
/// Records which wallet uploaded which content-addressed project, and
/// releases a record only to the wallet that can prove it owns it.
#[derive(Parser, Debug)]
#[command(
    name = "codesync-server",
    about = "CodeSync wallet-verified content registry",
    version,
    propagate_version = true
)]
pub struct CodesyncCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API.
    Run(RunArgs),
    /// Print a fresh ownership challenge for a wallet address.
    Challenge(ChallengeArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Port for the REST API.
    #[arg(long, short = 'p', env = "CODESYNC_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CODESYNC_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Directory for the persistent record store.
    ///
    /// When omitted, records live in memory and vanish on exit.
    #[arg(long, short = 'd', env = "CODESYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "CODESYNC_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Reject proofs whose challenge is older than this many seconds.
    ///
    /// Off by default: any signed message is accepted.
    #[arg(long, env = "CODESYNC_CHALLENGE_MAX_AGE_SECS")]
    pub challenge_max_age_secs: Option<u64>,
}

/// Arguments for the `challenge` subcommand.
#[derive(Parser, Debug)]
pub struct ChallengeArgs {
    /// Wallet address (`0x` + 40 hex digits, any case).
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        CodesyncCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = CodesyncCli::try_parse_from(["codesync-server", "run"]).unwrap();
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.port, 5000);
        assert_eq!(args.metrics_port, 9464);
        assert!(args.data_dir.is_none());
        assert!(args.challenge_max_age_secs.is_none());
    }

    #[test]
    fn challenge_takes_an_address() {
        let cli = CodesyncCli::try_parse_from([
            "codesync-server",
            "challenge",
            "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Challenge(a) if a.address.starts_with("0x7e5f")));
    }
}
