//! Quota commands.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use bothost_types::identity::UserId;
use bothost_types::quota::QuotaUpdate;

use crate::state::AppState;

pub async fn show_quota(state: &AppState, user: Option<UserId>, json: bool) -> Result<()> {
    let caller = state.local_operator();

    if let Some(user) = user {
        let quota = state.service.quota(&caller, user).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&quota)?);
        } else {
            println!();
            println!(
                "  User {}: {} stored, {} running",
                style(user).cyan(),
                style(quota.upload_limit).bold(),
                style(quota.run_limit).bold()
            );
            println!();
        }
        return Ok(());
    }

    let quotas = state.service.quotas(&caller).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&quotas)?);
        return Ok(());
    }

    if quotas.is_empty() {
        println!();
        println!(
            "  {} No explicit quotas. Everyone gets {} slots.",
            style("i").blue().bold(),
            state.config().default_slots
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("User").fg(Color::White),
        Cell::new("Upload Limit").fg(Color::White),
        Cell::new("Run Limit").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);
    for stored in &quotas {
        table.add_row(vec![
            Cell::new(stored.quota.user_id),
            Cell::new(stored.quota.upload_limit),
            Cell::new(stored.quota.run_limit),
            Cell::new(stored.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn set_quota(
    state: &AppState,
    user: UserId,
    upload_limit: Option<u32>,
    run_limit: Option<u32>,
    json: bool,
) -> Result<()> {
    if upload_limit.is_none() && run_limit.is_none() {
        bail!("nothing to change: pass --upload-limit, --run-limit or both");
    }

    let update = QuotaUpdate {
        upload_limit,
        run_limit,
    };
    let quota = state
        .service
        .set_quota(&state.local_operator(), user, &update)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&quota)?);
    } else {
        println!();
        println!(
            "  {} Quota for {} is now {} stored, {} running",
            style("✓").green().bold(),
            style(user).cyan(),
            quota.upload_limit,
            quota.run_limit
        );
        println!();
    }
    Ok(())
}
