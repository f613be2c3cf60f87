mod config;

use std::path::Path;

use progress_core::{Catalog, Clock, ModuleEntry};
use serde_json::json;
use services::AppServices;
use tracing_subscriber::EnvFilter;

use crate::config::{ArgsError, Command, Config, print_usage};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_catalog(path: Option<&Path>) -> Result<Catalog, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read catalog {}: {err}", path.display()))?;
    let entries: Vec<ModuleEntry> = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid catalog {}: {err}", path.display()))?;
    let catalog = Catalog::new(entries)?;
    tracing::debug!(path = %path.display(), modules = catalog.entries().len(), "catalog loaded");
    Ok(catalog)
}

/// Ensure the parent directory of a file-backed database exists before the first connect.
fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let Some(path) = db_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn print_json(value: &impl serde::Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    if config.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let catalog = load_catalog(config.catalog_path.as_deref())?;
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new_sqlite(
        &config.db_url,
        Clock::default(),
        catalog,
        config.storage_timeout,
    )
    .await?;
    let progress = services.progress();
    let sessions = services.sessions();

    let learner = match config.learner {
        Some(learner) => learner,
        None if needs_learner(&config.command) => {
            sessions.require_current().await?.as_str().to_owned()
        }
        None => String::new(),
    };

    match config.command {
        Command::Login { learner } => {
            let id = sessions.sign_in(&learner).await?;
            print_json(&json!({ "learner": id }))
        }
        Command::Logout => {
            let previous = sessions.sign_out().await?;
            print_json(&json!({ "signedOut": previous }))
        }
        Command::Whoami => {
            let current = sessions.current().await?;
            print_json(&json!({ "learner": current }))
        }
        Command::Modules => print_json(&progress.catalog().entries()),
        Command::Complete { module } => {
            print_json(&progress.mark_module_completed(&learner, &module).await?)
        }
        Command::Quiz {
            module,
            score,
            total,
        } => print_json(
            &progress
                .record_quiz_score(&learner, &module, score, total)
                .await?,
        ),
        Command::Summary => print_json(&progress.get_summary(&learner).await?),
        Command::Show => print_json(&progress.get_record(&learner).await?),
        Command::Reset => print_json(&progress.reset_progress(&learner).await?),
        Command::Help => Ok(()),
    }
}

fn needs_learner(command: &Command) -> bool {
    matches!(
        command,
        Command::Complete { .. }
            | Command::Quiz { .. }
            | Command::Summary
            | Command::Show
            | Command::Reset
    )
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = match Config::from_env_and_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            if matches!(err, ArgsError::MissingCommand | ArgsError::UnknownCommand(_)) {
                print_usage();
            }
            std::process::exit(2);
        }
    };

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "command failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
