//! bothost CLI and REST API entry point.
//!
//! Binary name: `bhost`
//!
//! Parses CLI arguments, opens the database and wires the supervisor, then
//! dispatches to a command handler or runs the server.

mod cli;
mod http;
mod state;

use std::sync::Arc;

use clap::Parser;
use clap_complete::generate;
use tokio_util::sync::CancellationToken;

use bothost_types::identity::UserId;
use cli::{Cli, Commands, QuotaCommand};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The server logs lifecycle and audit events at info by default.
    let serving = matches!(cli.command, Commands::Serve { .. });
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 if serving => "info",
        0 => "warn",
        1 => "info,bothost_core=debug,bothost_infra=debug",
        _ => "trace",
    };
    bothost_observe::tracing_setup::init_tracing(filter, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "bhost", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init().await?;

    let result = match cli.command {
        Commands::Serve { port, host } => serve(state, &host, port).await,
        Commands::Status { user } => cli::status::status(&state, user.map(UserId), cli.json).await,
        Commands::List { user } => cli::bots::list_bots(&state, user.map(UserId), cli.json).await,
        Commands::Quota { action } => match action {
            QuotaCommand::Show { user } => {
                cli::quota::show_quota(&state, user.map(UserId), cli.json).await
            }
            QuotaCommand::Set {
                user,
                upload_limit,
                run_limit,
            } => {
                cli::quota::set_quota(&state, UserId(user), upload_limit, run_limit, cli.json)
                    .await
            }
        },
        Commands::Activity { user, limit } => {
            cli::activity::show_activity(&state, user.map(UserId), limit, cli.json).await
        }
        Commands::Completions { .. } => unreachable!("handled above"),
    };

    bothost_observe::tracing_setup::shutdown_tracing();
    result
}

/// Run the supervisor and the REST API until Ctrl+C or SIGTERM.
async fn serve(state: AppState, host: &str, port: u16) -> anyhow::Result<()> {
    let lifecycle = Arc::clone(state.service.lifecycle());

    // Nothing is live yet, so every stored `running` record is stale.
    let monitor = lifecycle.crash_monitor(state.config().monitor_interval());
    let fixed = monitor.reconcile_stale_records().await;
    if fixed > 0 {
        tracing::info!(fixed, "reset stale running records from a previous run");
    }

    let cancel = CancellationToken::new();
    let monitor_task = monitor.spawn(cancel.clone());

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} bothost API listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    cancel.cancel();
    if let Err(e) = monitor_task.await {
        tracing::warn!(error = %e, "crash monitor task failed");
    }
    lifecycle.shutdown().await;

    println!("\n  Server stopped.");
    served.map_err(Into::into)
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
