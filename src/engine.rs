use anyhow::{Context, Result};
use bytesize::ByteSize;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, LocalBackend};
use crate::cli::{ApplyArgs, ConfigCommand, EnrichArgs, GlobalArgs, RemoveArgs, ScanArgs, ShowArgs};
use crate::config::{ConfigStore, FileConfigStore, default_config};
use crate::error::Error;
use crate::events::Event;
use crate::exit_codes::exit;
use crate::model;
use crate::naming::HttpNamer;
use crate::reporter::Reporter;
use crate::store::PlanStore;

fn session_path(state_dir: &Path) -> PathBuf {
    state_dir.join("session.json")
}

fn load_store(state_dir: &Path) -> Result<PlanStore> {
    let session = model::load_session(&session_path(state_dir)).context("failed to load session")?;
    Ok(PlanStore::from_session(session))
}

fn save_store(state_dir: &Path, store: &PlanStore) -> Result<()> {
    model::save_session(&session_path(state_dir), &store.to_session())
}

/// Print `err` and pick the exit code for it.
fn fail(err: &Error) -> i32 {
    tracing::debug!(error = ?err, "command failed");
    eprintln!("error: {err}");
    match err {
        Error::NoPlan | Error::IndexOutOfRange { .. } | Error::EnrichmentInProgress | Error::StalePlan => {
            exit::INVALID_REQUEST
        }
        Error::Apply(_) => exit::ROLLED_BACK,
        _ => exit::OPERATIONAL_FAILURE,
    }
}

pub fn schema() -> Result<i32> {
    println!("{}", model::generate_schema()?);
    Ok(exit::SUCCESS)
}

pub fn scan(global: &GlobalArgs, args: ScanArgs) -> Result<i32> {
    let config = FileConfigStore::new(&global.state_dir).load_config()?;
    let backend = LocalBackend::new(&global.state_dir);
    let mut store = load_store(&global.state_dir)?;
    let mut reporter = Reporter::new(global.json);

    let operations = match store.scan_and_plan(&backend, &args.root, &config, &mut reporter.observer()) {
        Ok(plan) => plan.len(),
        Err(e) => return Ok(fail(&e)),
    };
    save_store(&global.state_dir, &store)?;

    if !global.json {
        println!(
            "{operations} operations planned for {} files ({})",
            store.files_scanned(),
            ByteSize::b(store.bytes_scanned())
        );
    }
    Ok(exit::SUCCESS)
}

pub fn show(global: &GlobalArgs, args: ShowArgs) -> Result<i32> {
    let mut store = load_store(&global.state_dir)?;
    if store.plan().is_none() {
        return Ok(fail(&Error::NoPlan));
    }
    store.set_search(args.search);
    let visible = store.filtered();

    if global.json {
        let rows: Vec<_> = visible
            .iter()
            .map(|(index, op)| serde_json::json!({ "index": index, "operation": op }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(exit::SUCCESS);
    }

    if let Some(plan) = store.plan() {
        println!("{}", plan.summary);
    }
    for (index, op) in &visible {
        let src = op
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{index:>4}  {:<10} {src} -> {}  ({})",
            op.op_type,
            op.destination.display(),
            op.reason
        );
    }
    if !store.search().is_empty() {
        println!("{} of {} operations match", visible.len(), store.plan().map_or(0, |p| p.len()));
    }
    Ok(exit::SUCCESS)
}

pub fn remove(global: &GlobalArgs, args: RemoveArgs) -> Result<i32> {
    let mut store = load_store(&global.state_dir)?;
    let mut reporter = Reporter::new(global.json);

    let removed = if args.visible {
        store.set_search(args.search.unwrap_or_default());
        store.remove_visible(args.index)
    } else {
        store
            .remove_operation(args.index)
            .map(|op| (args.index, op))
    };
    let (index, removed) = match removed {
        Ok(found) => found,
        Err(e) => return Ok(fail(&e)),
    };
    save_store(&global.state_dir, &store)?;

    if !global.json {
        println!("removed {} ({} -> {})", removed.id, removed.op_type, removed.destination.display());
    }
    reporter.record(Event::OpRemoved {
        op_id: removed.id,
        index,
    });
    Ok(exit::SUCCESS)
}

pub fn enrich(global: &GlobalArgs, args: EnrichArgs) -> Result<i32> {
    let mut store = load_store(&global.state_dir)?;
    let namer = HttpNamer::new(args.endpoint, args.model).map_err(Error::from)?;
    let mut reporter = Reporter::new(global.json);
    store.set_search(args.search);

    let outcome = match store.enrich(&namer, &args.api_key, |p| p.exists(), &mut reporter.observer()) {
        Ok(outcome) => outcome,
        Err(e) => return Ok(fail(&e)),
    };
    save_store(&global.state_dir, &store)?;

    if outcome.failures > 0 {
        tracing::warn!(failures = outcome.failures, "some projects kept their names");
    }
    tracing::info!("{}", reporter.summary());
    Ok(exit::SUCCESS)
}

pub fn apply(global: &GlobalArgs, args: ApplyArgs) -> Result<i32> {
    let mut store = load_store(&global.state_dir)?;
    let mut backend = LocalBackend::new(&global.state_dir);
    let mut reporter = Reporter::new(global.json);

    let Some(plan) = store.plan() else {
        return Ok(fail(&Error::NoPlan));
    };
    if plan.is_empty() {
        eprintln!("plan has no operations");
        return Ok(exit::INVALID_REQUEST);
    }

    if args.dry_run {
        if let Err(e) = plan.validate() {
            return Ok(fail(&e));
        }
        for op in &plan.operations {
            reporter.record(Event::OpPlanned {
                op_id: op.id.clone(),
                op_type: op.op_type.to_string(),
                source: op.source.clone(),
                destination: op.destination.clone(),
            });
        }
        return Ok(exit::SUCCESS);
    }

    if let Err(e) = store.apply(&mut backend, &mut reporter.observer()) {
        return Ok(fail(&e));
    }
    save_store(&global.state_dir, &store)?;
    Ok(exit::SUCCESS)
}

pub fn undo(global: &GlobalArgs) -> Result<i32> {
    let mut store = load_store(&global.state_dir)?;
    let mut backend = LocalBackend::new(&global.state_dir);
    let mut reporter = Reporter::new(global.json);

    store.refresh_history(&backend)?;
    if !store.history().can_undo() {
        eprintln!("nothing to undo");
        return Ok(exit::INVALID_REQUEST);
    }
    if let Err(e) = store.undo(&mut backend, &mut reporter.observer()) {
        return Ok(fail(&e));
    }
    Ok(exit::SUCCESS)
}

pub fn history(global: &GlobalArgs) -> Result<i32> {
    let backend = LocalBackend::new(&global.state_dir);
    let mut store = PlanStore::new();
    store.refresh_history(&backend)?;

    if global.json {
        let batches: Vec<_> = store.history().newest_first().collect();
        println!("{}", serde_json::to_string_pretty(&batches)?);
        return Ok(exit::SUCCESS);
    }
    if store.history().is_empty() {
        println!("no applied batches");
        return Ok(exit::SUCCESS);
    }
    let now = chrono::Utc::now();
    for batch in store.history().newest_first() {
        let age = (now - batch.applied_at).to_std().unwrap_or_default();
        let age = std::time::Duration::from_secs(age.as_secs());
        println!(
            "{}  {} operations  {} ago",
            batch.id,
            batch.operations.len(),
            humantime::format_duration(age)
        );
    }
    Ok(exit::SUCCESS)
}

pub fn config(global: &GlobalArgs, command: ConfigCommand) -> Result<i32> {
    let configs = FileConfigStore::new(&global.state_dir);
    match command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(&configs.load_config()?)?);
        }
        ConfigCommand::Default => {
            println!("{}", serde_json::to_string_pretty(&default_config())?);
        }
        ConfigCommand::SaveDefault => {
            configs.save_config(&configs.default_config())?;
            println!("wrote {}", configs.path().display());
        }
        ConfigCommand::Open => configs.open_config_folder()?,
        ConfigCommand::Path => println!("{}", configs.path().display()),
    }
    Ok(exit::SUCCESS)
}

/// Dispatch the parsed command line.
pub fn run(cli: crate::cli::Cli) -> Result<i32> {
    use crate::cli::Command;

    let global = &cli.global;
    match cli.command {
        Command::Schema => schema(),
        Command::Scan(args) => scan(global, args),
        Command::Show(args) => show(global, args),
        Command::Remove(args) => remove(global, args),
        Command::Enrich(args) => enrich(global, args),
        Command::Apply(args) => apply(global, args),
        Command::Undo => undo(global),
        Command::History => history(global),
        Command::Config(command) => config(global, command),
    }
}
