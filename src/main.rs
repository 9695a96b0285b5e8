//! The `nous` command line.

mod cli;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use nous_cache::{Book, Repository};
use nous_config::Config;
use nous_library::{CoverFiles, Import, MigrationReport};
use nous_storage::BackendHandle;
use nous_storage::backend::LocalBackend;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            if err.is_retryable() {
                eprintln!("The database may be busy; try again shortly.");
            }
            ExitCode::FAILURE
        },
    }
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    init_logging(&config);

    // Creates the data directory, so it has to exist before the database.
    let backend: BackendHandle =
        Arc::new(LocalBackend::new("library", &config.data_dir).or_raise(|| ErrorKind::Storage)?);
    let covers = CoverFiles::new(backend, &config.covers_dir);
    let db = nous_cache::shared(config.database_path()).await.or_raise(|| ErrorKind::Database)?;
    let repo = Repository::from(db);

    if config.migrate_on_start && !matches!(cli.command, Command::MigrateCovers) {
        // Whatever fails is retried next start.
        if let Err(err) = nous_library::migrate_covers(&repo, &covers).await {
            tracing::warn!(error = ?err, "cover migration failed");
        }
    }

    let result = match cli.command {
        Command::Import { file } => import(&repo, &covers, file).await,
        Command::List => list(&repo).await,
        Command::MigrateCovers => migrate(&repo, &covers).await,
        Command::Remove { id } => remove(&repo, &covers, &id).await,
    };
    db.close().await;
    result
}

async fn import(repo: &Repository, covers: &CoverFiles, file: std::path::PathBuf) -> Result<()> {
    let file = std::path::absolute(&file).or_raise(|| ErrorKind::Command)?;
    match nous_library::import_book(repo, covers, &file).await.or_raise(|| ErrorKind::Command)? {
        Import::Imported(book) => println!("Imported {}", describe(&book)),
        Import::AlreadyExists(book) => println!("Already in the library: {}", describe(&book)),
    }
    Ok(())
}

async fn list(repo: &Repository) -> Result<()> {
    for book in repo.list_books().await.or_raise(|| ErrorKind::Command)? {
        println!("{}", describe(&book));
    }
    Ok(())
}

async fn migrate(repo: &Repository, covers: &CoverFiles) -> Result<()> {
    let MigrationReport { discovered, migrated, skipped } =
        nous_library::migrate_covers(repo, covers).await.or_raise(|| ErrorKind::Command)?;
    println!("{migrated} of {discovered} covers migrated, {skipped} skipped");
    Ok(())
}

async fn remove(repo: &Repository, covers: &CoverFiles, id: &str) -> Result<()> {
    if nous_library::remove_book(repo, covers, id).await.or_raise(|| ErrorKind::Command)? {
        println!("Removed {id}");
    } else {
        println!("No book with id {id}");
    }
    Ok(())
}

fn describe(book: &Book) -> String {
    match &book.author {
        Some(author) => format!("{}  {} by {}", book.id, book.title, author),
        None => format!("{}  {}", book.id, book.title),
    }
}
