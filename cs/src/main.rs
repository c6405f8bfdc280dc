use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use contextstore::cli::{Cli, Command};
use contextstore::config::Config;
use contextstore::{ContextStore, chunk};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("contextstore starting");
    let store = ContextStore::open(&config.store_path)?;

    match cli.command {
        Command::Ingest {
            paths,
            chunk_size,
            overlap,
        } => {
            let size = chunk_size.unwrap_or(config.default_chunk_size);
            let overlap = overlap.unwrap_or(config.default_overlap);

            store.clear()?;
            let mut total = 0;
            for pattern in &paths {
                let entries = glob::glob(pattern).context(format!("Invalid glob pattern: {}", pattern))?;
                for entry in entries {
                    let path = entry?;
                    if !path.is_file() {
                        continue;
                    }
                    let content =
                        std::fs::read_to_string(&path).context(format!("Failed to read file: {}", path.display()))?;
                    let chunks = chunk(&content, size, overlap)?;
                    total += store.index(&path.to_string_lossy(), &chunks)?;
                }
            }
            println!("{} Indexed {} chunks into {}", "✓".green(), total, store.path().display().to_string().cyan());
        }
        Command::Query { text, top_k } => {
            let ranked = store.query(&text, top_k.unwrap_or(config.default_top_k))?;
            for r in ranked {
                let preview: String = r.text.chars().take(80).collect();
                println!(
                    "{} {} {}",
                    r.chunk_id.yellow(),
                    format!("{:.3}", r.score).dimmed(),
                    preview.replace('\n', " ")
                );
            }
        }
        Command::Cat { chunk_id } => {
            let content = store.get_chunk(&chunk_id)?;
            println!("{}", content);
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("Store: {}", store.path().display().to_string().cyan());
            println!("  Chunks: {}", stats.chunk_count);
            println!("  Total chars: {}", stats.total_chars);
            println!("  Sources: {}", stats.source_count);
        }
        Command::Clear => {
            store.clear()?;
            println!("{} Cleared {}", "✓".green(), store.path().display());
        }
    }

    Ok(())
}
