//! `tidyplan` - plan, review, enrich and apply directory reorganisations.
//!
//! See `README.md` for usage and `DESIGN.md` for architecture.

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use tidyplan::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.global.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let exit_code = tidyplan::engine::run(cli)?;
    std::process::exit(exit_code);
}
