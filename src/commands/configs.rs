use crate::Context as AppContext;
use crate::commands::Session;
use crate::ui;
use anyhow::{Result, bail};
use blueprint::check_references;
use colored::Colorize;

/// List configurations in the configs directory
pub fn list(ctx: &AppContext) -> Result<()> {
    let session = Session::open()?;
    let summaries = session.loader.list()?;

    if summaries.is_empty() {
        ui::info(&format!(
            "No configurations found in {}",
            session.loader.dir().display()
        ));
        return Ok(());
    }

    if !ctx.quiet {
        ui::header("Configurations");
    }
    let width = summaries.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for summary in &summaries {
        println!(
            "  {:<width$}  {} {}",
            summary.name.bold(),
            summary.title,
            format!("({} resources)", summary.resource_count).dimmed()
        );
        if ctx.verbose > 0
            && let Some(description) = &summary.description
        {
            ui::dim(description);
        }
    }
    Ok(())
}

/// Load a configuration and check its references without touching any resource
pub fn validate(ctx: &AppContext, name: &str) -> Result<()> {
    let session = Session::open()?;

    let config = match session.loader.load(name) {
        Ok(config) => config,
        Err(e) if !e.violations().is_empty() => {
            report(e.violations());
            bail!("'{name}' failed schema validation");
        }
        Err(e) => return Err(e.into()),
    };

    let violations = check_references(&config);
    if !violations.is_empty() {
        report(&violations);
        bail!("'{name}' has {} invalid reference(s)", violations.len());
    }

    if !ctx.quiet {
        ui::success(&format!(
            "'{}' is valid ({} resources)",
            config.name,
            config.resources.len()
        ));
        if ctx.verbose > 0 {
            for resource in &config.resources {
                ui::dim(&format!(
                    "{} {} (${{{}}})",
                    resource.resource_type, resource.name, resource.id_reference
                ));
            }
        }
    }
    Ok(())
}

fn report(violations: &[String]) {
    for violation in violations {
        ui::error(violation);
    }
}
