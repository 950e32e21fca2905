use crate::Context as AppContext;
use crate::cli::InstallArgs;
use crate::commands::Session;
use crate::progress::ConsoleProgress;
use crate::ui;
use anyhow::{Result, bail};
use blueprint::{AuditEntry, ProvisionOutcome, RunOptions, provision, rollback};
use std::io::IsTerminal;

pub fn run(ctx: &AppContext, args: InstallArgs) -> Result<()> {
    let session = Session::open()?;
    let config = session.loader.load_validated(&args.name)?;
    let workspace = session.workspace(args.workspace.clone());
    let opts = RunOptions::new(workspace).dry_run(args.dry_run);

    if !ctx.quiet {
        ui::header(&format!("Install: {}", config.title));
        ui::kv("Workspace", &opts.workspace);
        ui::kv("Resources", &config.resources.len().to_string());
        if opts.dry_run {
            ui::info("Dry run - no changes will be made");
        }
        println!();
    }

    let mut progress = ConsoleProgress::new(ctx.quiet);
    let outcome = provision(&session.registry, &config, &opts, &mut progress);
    session
        .audit
        .record(&AuditEntry::for_install(&config, &opts, &outcome));

    if !ctx.quiet {
        ui::print_summary(&outcome.summary());
    }

    let Some(error) = &outcome.error else {
        if !ctx.quiet {
            ui::success(&format!("'{}' installed in '{}'", config.name, opts.workspace));
        }
        return Ok(());
    };

    ui::error(&error.to_string());

    if should_roll_back(&args, &outcome)? {
        println!();
        let undone = rollback(&session.registry, &config, &outcome, &opts, &mut progress);
        session
            .audit
            .record(&AuditEntry::for_cleanup(&config, &opts, &undone));
        if !ctx.quiet {
            ui::print_summary(&undone.summary());
        }
        if undone.has_failures() {
            ui::warn("Some resources could not be rolled back; run `exemplar delete` to retry");
        }
    } else if outcome.created().next().is_some() {
        ui::dim(&format!(
            "Created resources were left in place; run `exemplar delete {}` to remove them",
            config.name
        ));
    }

    bail!("Install of '{}' did not complete", config.name)
}

/// Decide whether to undo what a failed run created
fn should_roll_back(args: &InstallArgs, outcome: &ProvisionOutcome) -> Result<bool> {
    let created = outcome.created().count();
    if created == 0 || args.dry_run || args.no_rollback {
        return Ok(false);
    }
    if args.yes {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        log::info!("Not a terminal; skipping rollback prompt");
        return Ok(false);
    }
    confirm_rollback(created)
}

fn confirm_rollback(created: usize) -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt(format!(
            "Roll back the {created} resource(s) created by this run?"
        ))
        .default(true)
        .interact()?;

    Ok(confirmed)
}
