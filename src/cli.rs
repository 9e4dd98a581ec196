use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Plan, review, enrich and apply a reorganisation of a directory.
#[derive(Parser)]
#[command(name = "tidyplan", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Clone)]
pub struct GlobalArgs {
    /// Directory holding the session, config, history and trash.
    #[arg(long, global = true, env = "TIDYPLAN_HOME", default_value = ".tidyplan")]
    pub state_dir: PathBuf,

    /// Output structured JSON events to stdout.
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print JSON Schema for the session file.
    Schema,
    /// Scan a directory and propose a plan.
    Scan(ScanArgs),
    /// List the pending operations.
    Show(ShowArgs),
    /// Drop one operation from the pending plan.
    Remove(RemoveArgs),
    /// Rename project destinations with AI-suggested names.
    Enrich(EnrichArgs),
    /// Apply the pending plan.
    Apply(ApplyArgs),
    /// Undo the most recently applied batch.
    Undo,
    /// List applied batches, newest first.
    History,
    /// Inspect or manage the organisation config.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args)]
pub struct ScanArgs {
    /// Directory to reorganise.
    #[arg(long, required = true)]
    pub root: PathBuf,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Only list operations whose source, destination or type contains this text.
    #[arg(long, default_value = "")]
    pub search: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Position of the operation (as printed by `show`).
    #[arg(long, required = true)]
    pub index: usize,

    /// Interpret `--index` as a position in the `--search` view.
    #[arg(long, requires = "search")]
    pub visible: bool,

    /// Search query defining the view for `--visible`.
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args)]
pub struct EnrichArgs {
    /// Credential for the naming service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Only enrich operations matching this text.
    #[arg(long, default_value = "")]
    pub search: String,

    /// Chat-completions endpoint.
    #[arg(long, default_value = crate::naming::DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Model name sent to the endpoint.
    #[arg(long, default_value = crate::naming::DEFAULT_MODEL)]
    pub model: String,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// List what would happen without touching the filesystem.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand, Clone, Copy)]
pub enum ConfigCommand {
    /// Print the active config.
    Show,
    /// Print the built-in default config.
    Default,
    /// Write the built-in default config to the state directory.
    SaveDefault,
    /// Open the config folder in the file manager.
    Open,
    /// Print the config file path.
    Path,
}
