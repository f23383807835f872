//! Status dashboard command.

use anyhow::Result;
use console::style;

use bothost_types::bot::BotStatus;
use bothost_types::identity::UserId;

use crate::state::AppState;

/// Display host status, or one user's usage against their quota.
///
/// Running counts come from the stored records: this process does not own
/// the server's registry.
pub async fn status(state: &AppState, user: Option<UserId>, json: bool) -> Result<()> {
    let caller = state.local_operator();
    let records = state.service.stored(&caller, user).await?;
    let running = records
        .iter()
        .filter(|r| r.status == BotStatus::Running)
        .count();

    match user {
        Some(user) => {
            let quota = state.service.quota(&caller, user).await?;
            if json {
                let status = serde_json::json!({
                    "user": user,
                    "total": records.len(),
                    "running": running,
                    "quota": quota,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!();
            println!("  {} User {}", style("👤").bold(), style(user).cyan());
            println!();
            println!(
                "  Stored:   {} / {}",
                style(records.len()).bold(),
                quota.upload_limit
            );
            println!("  Running:  {} / {}", style(running).green(), quota.run_limit);
            println!();
        }
        None => {
            let stats = state.service.stats(&caller).await?;
            if json {
                let status = serde_json::json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "data_dir": state.data_dir.display().to_string(),
                    "users": stats.users,
                    "uploads": stats.uploads,
                    "running": running,
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
                return Ok(());
            }

            println!();
            println!(
                "  {} bothost v{}",
                style("⚡").bold(),
                env!("CARGO_PKG_VERSION")
            );
            println!();
            println!("  {}", style("── Bots ──").dim());
            println!("  Users:    {}", style(stats.users).bold());
            println!("  Stored:   {}", style(stats.uploads).bold());
            println!("  Running:  {}", style(running).green());
            println!();
            println!("  {}", style("── System ──").dim());
            println!("  Data dir: {}", style(state.data_dir.display()).dim());
            println!("  Database: {}", style("SQLite (WAL mode)").dim());
            match state.config().admin() {
                Some(admin) => println!("  Admin:    {}", style(admin).dim()),
                None => println!("  Admin:    {}", style("not configured").yellow()),
            }
            println!();
        }
    }

    Ok(())
}
