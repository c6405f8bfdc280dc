//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

/// SpecPlan - planning artifacts from a project specification
#[derive(Parser)]
#[command(
    name = "sp",
    about = "Turn a free-text project specification into planning artifacts",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan a project: index the spec, choose a workflow and run every task
    Run {
        /// Specification files; several files are joined into one document
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Use this builtin template
        #[arg(short, long, conflicts_with_all = ["auto", "workflow"])]
        template: Option<String>,

        /// Use the template suggested by the document's keywords
        #[arg(short, long, conflicts_with = "workflow")]
        auto: bool,

        /// Use a previously exported workflow file
        #[arg(short, long, value_name = "PATH")]
        workflow: Option<PathBuf>,

        /// Goal that steers a generated workflow
        #[arg(short, long)]
        goal: Option<String>,

        /// Fall back to the suggested template if generation fails
        #[arg(short, long)]
        fallback: bool,

        /// Write the chosen workflow as JSON before running it
        #[arg(long, value_name = "PATH")]
        export_workflow: Option<PathBuf>,
    },

    /// List builtin templates
    Templates,

    /// Suggest a template for a specification file
    Suggest {
        /// Specification file
        file: PathBuf,
    },

    /// Show recent runs, newest first
    History {
        /// Number of runs to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Export a builtin template as workflow JSON
    Export {
        /// Template id (see `sp templates`)
        template_id: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("specplan")
        .join("logs")
        .join("specplan.log");
    debug!(?path, "get_log_path: returning path");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_template() {
        let cli = Cli::try_parse_from(["sp", "run", "a.md", "b.md", "--template", "event_planning"]).unwrap();
        match cli.command {
            Command::Run { files, template, auto, .. } => {
                assert_eq!(files.len(), 2);
                assert_eq!(template.as_deref(), Some("event_planning"));
                assert!(!auto);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_template_conflicts_with_auto() {
        assert!(Cli::try_parse_from(["sp", "run", "a.md", "--template", "x", "--auto"]).is_err());
    }

    #[test]
    fn test_run_requires_files() {
        assert!(Cli::try_parse_from(["sp", "run"]).is_err());
    }

    #[test]
    fn test_history_default_count() {
        let cli = Cli::try_parse_from(["sp", "history"]).unwrap();
        assert!(matches!(cli.command, Command::History { count: 10 }));
    }
}
