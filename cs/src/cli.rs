//! CLI argument parsing for contextstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cs")]
#[command(author, version, about = "Chunked context store with similarity retrieval", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replace the store contents with the given files
    Ingest {
        /// File paths or glob patterns to ingest
        #[arg(required = true)]
        paths: Vec<String>,

        /// Chunk size in characters (default: 800)
        #[arg(short = 's', long)]
        chunk_size: Option<usize>,

        /// Overlap between chunks in characters (default: 200)
        #[arg(short, long)]
        overlap: Option<usize>,
    },

    /// Rank stored chunks against a query
    Query {
        /// Free-text query
        #[arg(required = true)]
        text: String,

        /// Maximum results to return
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Display a chunk's content
    Cat {
        /// Chunk ID to display
        #[arg(required = true)]
        chunk_id: String,
    },

    /// Show statistics for the store
    Stats,

    /// Remove all indexed chunks
    Clear,
}
