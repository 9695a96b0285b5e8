use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// A reading library for EPUB books
#[derive(Parser, Debug)]
#[command(name = "nous", version, about)]
pub struct Cli {
    /// Configuration file to use instead of the default `nous.toml`
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add an EPUB to the library
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// List every book, most recently added first
    List,
    /// Move covers stored inside the database out into files
    MigrateCovers,
    /// Remove a book, its annotations and its cover file
    Remove { id: String },
}
