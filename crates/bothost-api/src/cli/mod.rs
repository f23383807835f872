//! CLI command definitions for the `bhost` binary.
//!
//! Uses clap derive macros for argument parsing. Every command except
//! `serve` is a local administrative tool that reads the same database the
//! server writes.

pub mod activity;
pub mod bots;
pub mod quota;
pub mod status;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Host and supervise user-uploaded bot programs.
#[derive(Parser)]
#[command(name = "bhost", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true, env = "BOTHOST_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server and the supervisor.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value_t = 3000)]
        port: u16,

        /// Host address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Show host status, or one user's usage and quota.
    Status {
        /// User id to report on.
        #[arg(long)]
        user: Option<i64>,
    },

    /// List stored bots.
    #[command(alias = "ls")]
    List {
        /// Only bots owned by this user.
        #[arg(long)]
        user: Option<i64>,
    },

    /// Show or change per-user quotas.
    Quota {
        #[command(subcommand)]
        action: QuotaCommand,
    },

    /// Show recent audit entries.
    Activity {
        /// Only entries of this user.
        #[arg(long)]
        user: Option<i64>,

        /// Maximum number of entries.
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum QuotaCommand {
    /// Show one user's effective quota, or every explicit quota.
    Show {
        #[arg(long)]
        user: Option<i64>,
    },

    /// Change a user's limits. Unset limits keep their value.
    Set {
        #[arg(long)]
        user: i64,

        /// Maximum number of stored bots.
        #[arg(long)]
        upload_limit: Option<u32>,

        /// Maximum number of concurrently running bots.
        #[arg(long)]
        run_limit: Option<u32>,
    },
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
    fn parses_quota_set() {
        let cli = Cli::try_parse_from([
            "bhost", "quota", "set", "--user", "7", "--run-limit", "1",
        ])
        .unwrap();
        match cli.command {
            Commands::Quota {
                action:
                    QuotaCommand::Set {
                        user,
                        upload_limit,
                        run_limit,
                    },
            } => {
                assert_eq!(user, 7);
                assert_eq!(upload_limit, None);
                assert_eq!(run_limit, Some(1));
            }
            _ => panic!("expected quota set"),
        }
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["bhost", "-v", "serve"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Serve { port: 3000, .. }));
    }
}
