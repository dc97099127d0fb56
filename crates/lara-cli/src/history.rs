//! Offline commands over stored conversations.

use anyhow::Result;
use chrono::{Local, TimeZone};
use colored::Colorize;
use lara_core::AppCore;
use lara_core::models::{Conversation, TurnRole};

use crate::cli::OutputFormat;

pub fn show(core: &AppCore, user: &str, format: OutputFormat) -> Result<()> {
    let Some(conversation) = core.storage.conversations.get(user)? else {
        println!("{}", format!("No conversation stored for {}.", user).yellow());
        return Ok(());
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&conversation)?),
        OutputFormat::Text => print_text(&conversation),
    }
    Ok(())
}

fn print_text(conversation: &Conversation) {
    if conversation.has_summary() {
        println!(
            "{} (covers {} turns)",
            "Summary".bold(),
            conversation.cutoff()
        );
        println!("{}\n", conversation.summary.dimmed());
    }

    for (index, turn) in conversation.messages.iter().enumerate() {
        let time = Local
            .timestamp_millis_opt(turn.created_at)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let role = match turn.role {
            TurnRole::User => "you".blue(),
            TurnRole::Assistant => "lara".cyan(),
            TurnRole::System => "system".dimmed(),
        };
        let marker = if index < conversation.cutoff() { "~" } else { " " };
        println!("{} {} {}: {}", marker.dimmed(), time.dimmed(), role, turn.content);
    }
}

pub fn list_users(core: &AppCore) -> Result<()> {
    let users = core.storage.conversations.list_users()?;
    if users.is_empty() {
        println!("{}", "No stored conversations.".dimmed());
    }
    for user in users {
        println!("{}", user);
    }
    Ok(())
}

pub fn reset(core: &AppCore, user: &str) -> Result<()> {
    if core.storage.conversations.delete(user)? {
        println!("{} {}", "Deleted conversation for".green(), user.bold());
    } else {
        println!("{}", format!("No conversation stored for {}.", user).yellow());
    }
    Ok(())
}
