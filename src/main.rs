mod cli;
mod commands;
mod paths;
mod progress;
mod sandbox;
mod settings;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::List => commands::configs::list(&ctx),
        Command::Validate { name } => commands::configs::validate(&ctx, &name),
        Command::Install(args) => commands::install::run(&ctx, args),
        Command::Delete(args) => commands::delete::run(&ctx, args),
        Command::Log(args) => commands::history::run(&ctx, args),
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "exemplar", &mut io::stdout());
            Ok(())
        }
    }
}
