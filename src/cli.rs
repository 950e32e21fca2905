use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "exemplar")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Install and tear down example resource graphs from declarative configs", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List available example configurations
    List,

    /// Validate a configuration without touching any resource
    Validate {
        /// Configuration name
        name: String,
    },

    /// Create every resource a configuration declares
    Install(InstallArgs),

    /// Delete the resources a configuration created
    Delete(DeleteArgs),

    /// Show the audit log
    Log(LogArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

#[derive(Parser)]
pub struct InstallArgs {
    /// Configuration name
    pub name: String,

    /// Workspace to install into (defaults to the settings file)
    #[arg(short, long, env = "EXEMPLAR_WORKSPACE")]
    pub workspace: Option<String>,

    /// Dry run - show what would be created
    #[arg(short, long)]
    pub dry_run: bool,

    /// Roll back without asking if the install fails
    #[arg(short, long, conflicts_with = "no_rollback")]
    pub yes: bool,

    /// Leave partially created resources in place on failure
    #[arg(long)]
    pub no_rollback: bool,
}

#[derive(Parser)]
pub struct DeleteArgs {
    /// Configuration name
    pub name: String,

    /// Workspace to delete from (defaults to the settings file)
    #[arg(short, long, env = "EXEMPLAR_WORKSPACE")]
    pub workspace: Option<String>,

    /// Dry run - show what would be deleted
    #[arg(short, long)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct LogArgs {
    /// Show only the most recent N records
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Print records as JSON lines
    #[arg(long)]
    pub json: bool,
}
