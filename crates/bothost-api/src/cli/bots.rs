//! Bot listing command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use bothost_types::bot::BotStatus;
use bothost_types::identity::UserId;

use crate::state::AppState;

/// List stored bots in a table.
pub async fn list_bots(state: &AppState, user: Option<UserId>, json: bool) -> Result<()> {
    let bots = state.service.stored(&state.local_operator(), user).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&bots)?);
        return Ok(());
    }

    if bots.is_empty() {
        println!();
        println!("  {} No bots uploaded yet.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Owner").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("Size").fg(Color::White),
        Cell::new("Uploaded").fg(Color::White),
        Cell::new("Last Started").fg(Color::White),
    ]);

    for bot in &bots {
        let status_cell = match bot.status {
            BotStatus::Running => Cell::new("● running").fg(Color::Green),
            BotStatus::Stopped => Cell::new("○ stopped").fg(Color::DarkGrey),
            other => Cell::new(format!("◌ {other}")).fg(Color::Yellow),
        };
        let last_started = bot
            .last_started
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "never".to_string());

        table.add_row(vec![
            Cell::new(bot.identity.owner),
            Cell::new(&bot.identity.name),
            status_cell,
            Cell::new(format_size(bot.size)),
            Cell::new(bot.uploaded_at.format("%Y-%m-%d %H:%M")),
            Cell::new(last_started),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    match bytes {
        b if b >= 1024 * 1024 => format!("{:.1} MB", b as f64 / (1024.0 * 1024.0)),
        b if b >= 1024 => format!("{:.1} KB", b as f64 / 1024.0),
        b => format!("{b} B"),
    }
}
