//! Audit log command.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use bothost_types::identity::UserId;

use crate::state::AppState;

pub async fn show_activity(
    state: &AppState,
    user: Option<UserId>,
    limit: i64,
    json: bool,
) -> Result<()> {
    let entries = state
        .service
        .activity(&state.local_operator(), user, limit.max(1))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!();
        println!("  {} No activity recorded.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Time").fg(Color::White),
        Cell::new("User").fg(Color::White),
        Cell::new("Action").fg(Color::White),
        Cell::new("Details").fg(Color::White),
    ]);
    for entry in &entries {
        table.add_row(vec![
            Cell::new(entry.created_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(entry.user_id),
            Cell::new(entry.action.as_str()),
            Cell::new(&entry.details),
        ]);
    }
    println!("{table}");
    Ok(())
}
