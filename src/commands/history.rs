use crate::Context as AppContext;
use crate::cli::LogArgs;
use crate::commands::Session;
use crate::ui;
use anyhow::{Context as AnyhowContext, Result};
use blueprint::AuditEntry;
use colored::Colorize;

/// Show audit records, oldest first
pub fn run(ctx: &AppContext, args: LogArgs) -> Result<()> {
    let session = Session::open()?;
    let entries = session.audit.read_entries().with_context(|| {
        format!(
            "Failed to read audit log: {}",
            session.audit.path().display()
        )
    })?;

    if entries.is_empty() {
        if !args.json {
            ui::info("No audit records yet");
        }
        return Ok(());
    }

    let skip = args
        .limit
        .map_or(0, |limit| entries.len().saturating_sub(limit));

    for entry in &entries[skip..] {
        if args.json {
            println!("{}", serde_json::to_string(entry)?);
        } else {
            print_entry(entry, ctx.verbose > 0);
        }
    }
    Ok(())
}

fn print_entry(entry: &AuditEntry, detailed: bool) {
    let status = if entry.is_success() {
        "✓".green()
    } else {
        "✗".red()
    };
    let dry_run = if entry.dry_run { " (dry run)" } else { "" };

    println!(
        "{} {} {:<7} {} {}{}",
        status,
        entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
        entry.operation.to_string(),
        entry.config.bold(),
        format!("@{}", entry.workspace).dimmed(),
        dry_run.cyan()
    );

    if detailed {
        ui::print_results(&entry.results);
    } else {
        ui::dim(&entry.summary().to_string());
    }
    if let Some(error) = &entry.error {
        ui::dim(error);
    }
}
