//! Ledger inspection and reset commands

use anyhow::{Context, Result};
use console::style;
use purger::{guard::format_timestamp, reset_purge_data, Notifier, HISTORY_LIMIT};

use crate::context::{AppContext, Tone};

pub fn stats(ctx: &AppContext) -> Result<()> {
    let state = ctx.ledger.statistics();
    let creds = &ctx.config.credentials;

    ctx.say(Tone::Heading, "Purge ledger");
    ctx.field("Ledger", ctx.config.ledger_path().display());
    ctx.field("Archive root", ctx.config.archive_root.display());
    ctx.field("Clients purged", state.completed_count);
    ctx.field("Next sequence id", state.next_sequence_id);
    ctx.field("History entries", state.history.len());
    ctx.field("Signed in as", creds.username().unwrap_or("(TP_USERNAME not set)"));
    if !creds.has_password() {
        ctx.say(Tone::Caution, "TP_PASSWORD is not set; purges will fail to sign in");
    }

    if let Some(last) = state.history.last() {
        ctx.field(
            "Last purge",
            format!(
                "{} ({}) at {}",
                last.display_name,
                last.subject_key,
                format_timestamp(&last.timestamp)
            ),
        );
    }
    Ok(())
}

pub fn history(ctx: &AppContext, limit: usize) -> Result<()> {
    let events = ctx.ledger.recent_history(limit.min(HISTORY_LIMIT));
    if events.is_empty() {
        ctx.say(Tone::Note, "No purges recorded yet");
        return Ok(());
    }

    ctx.say(Tone::Heading, &format!("Last {} purge(s)", events.len()));
    for event in events.iter().rev() {
        let status = if event.success {
            style("ok").green()
        } else {
            style("failed").red()
        };
        println!(
            "  {} {:>8}  {:<10} {:<30} {:>12} bytes  {}  {}",
            format_timestamp(&event.timestamp),
            event.sequence_id,
            event.subject_key,
            event.display_name,
            event.bytes_written,
            event.operator,
            status
        );
    }
    Ok(())
}

pub fn check(ctx: &AppContext, client_id: &str) -> Result<()> {
    let client_id = client_id.trim();
    let Some(record) = ctx.ledger.last_success(client_id) else {
        ctx.say(Tone::Good, &format!("Client {client_id} has not been purged"));
        return Ok(());
    };

    ctx.say(Tone::Caution, &format!("Client {client_id} was already purged"));
    ctx.field("Name", &record.display_name);
    ctx.field("When", format_timestamp(&record.timestamp));
    ctx.field("Sequence", record.sequence_id);
    ctx.field("Bytes", record.bytes_written);
    ctx.field("Operator", &record.operator);
    Ok(())
}

pub fn reset(ctx: &AppContext, yes: bool) -> Result<()> {
    ctx.say(Tone::Heading, "Reset purge data");
    ctx.say(
        Tone::Caution,
        &format!(
            "This deletes {} and every purge counter.",
            ctx.config.archive_root.display()
        ),
    );

    if !yes && !ctx.confirm("Are you sure?", false)? {
        ctx.say(Tone::Note, "Reset cancelled");
        return Ok(());
    }

    reset_purge_data(&ctx.config.archive_root, &ctx.ledger, &Notifier::new())
        .context("Reset failed")?;
    ctx.say(Tone::Good, "Purge archives and counters reset");
    Ok(())
}
