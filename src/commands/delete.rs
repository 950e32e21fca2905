use crate::Context as AppContext;
use crate::cli::DeleteArgs;
use crate::commands::Session;
use crate::progress::ConsoleProgress;
use crate::ui;
use anyhow::{Result, bail};
use blueprint::{AuditEntry, RunOptions, cleanup};

pub fn run(ctx: &AppContext, args: DeleteArgs) -> Result<()> {
    let session = Session::open()?;
    // Schema only: deletion never resolves references
    let config = session.loader.load(&args.name)?;
    let opts = RunOptions::new(session.workspace(args.workspace)).dry_run(args.dry_run);

    if !ctx.quiet {
        ui::header(&format!("Delete: {}", config.title));
        ui::kv("Workspace", &opts.workspace);
        ui::kv("Order", &config.cleanup.order.join(" → "));
        if opts.dry_run {
            ui::info("Dry run - no changes will be made");
        }
        println!();
    }

    let mut progress = ConsoleProgress::new(ctx.quiet);
    let outcome = cleanup(&session.registry, &config, &opts, &mut progress);
    session
        .audit
        .record(&AuditEntry::for_cleanup(&config, &opts, &outcome));

    let summary = outcome.summary();
    if !ctx.quiet {
        ui::print_summary(&summary);
    }

    if outcome.has_failures() {
        bail!(
            "{} resource(s) of '{}' could not be deleted",
            summary.failed,
            config.name
        );
    }
    Ok(())
}
