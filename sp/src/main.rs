//! SpecPlan - planning artifacts from a project specification
//!
//! CLI entry point.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use specplan::cli::{Cli, Command, get_log_path};
use specplan::config::Config;
use specplan::domain::{Document, TaskOutcome, Workflow, validate_text};
use specplan::error::PlanError;
use specplan::history::HistoryRecorder;
use specplan::planner::{PlanRequest, Planner, RunReport, WorkflowSelection};
use specplan::templates::TemplateRegistry;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Attach the recovery hint so the user knows what to do next
fn with_hint(err: PlanError) -> eyre::Report {
    eyre!("{}\n{} {}", err, "hint:".yellow(), err.recovery_hint())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().map_err(with_hint)?;
    info!("SpecPlan loaded config: provider={} model={}", config.llm.provider, config.llm.model());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            files,
            template,
            auto,
            workflow,
            goal,
            fallback,
            export_workflow,
        } => {
            let selection = match (template, workflow) {
                (Some(id), _) => WorkflowSelection::Template(id),
                (None, Some(path)) => WorkflowSelection::Provided(Workflow::import(&path).map_err(with_hint)?),
                (None, None) if auto => WorkflowSelection::Suggest,
                (None, None) => WorkflowSelection::Generate { goal, fallback },
            };
            cmd_run(config, &files, selection, export_workflow).await
        }
        Command::Templates => cmd_templates(),
        Command::Suggest { file } => cmd_suggest(&file),
        Command::History { count } => cmd_history(&config, count),
        Command::Export { template_id, output } => cmd_export(&template_id, output.as_deref()),
    }
}

/// Read and validate every input file before anything touches the model
fn read_documents(files: &[PathBuf]) -> Result<Vec<Document>> {
    files
        .iter()
        .map(|path| {
            let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            Document::new(path.display().to_string(), text).map_err(with_hint)
        })
        .collect()
}

async fn cmd_run(
    config: Config,
    files: &[PathBuf],
    selection: WorkflowSelection,
    export_workflow: Option<PathBuf>,
) -> Result<()> {
    debug!(?files, ?selection, "cmd_run: called");
    let documents = read_documents(files)?;

    let workdir = std::env::current_dir().context("Failed to get current directory")?;
    let planner = Planner::from_config(config, &workdir).map_err(with_hint)?;

    println!("{} Planning from {} file(s)...", "→".cyan(), files.len());
    let report = planner
        .plan(PlanRequest {
            documents,
            selection,
            export_workflow,
        })
        .await
        .map_err(with_hint)?;

    print_report(&report);
    Ok(())
}

fn print_report(report: &RunReport) {
    if let Some(reason) = &report.fallback_reason {
        println!("{} Workflow generation failed ({}), used template instead", "!".yellow(), reason);
    }
    let source = report.template_id.as_deref().unwrap_or("generated");
    println!(
        "{} {} ({} tasks, {})",
        "Workflow:".bold(),
        report.workflow.workflow_name.cyan(),
        report.workflow.len(),
        source.dimmed()
    );
    println!();

    for result in &report.results {
        match &result.outcome {
            TaskOutcome::Succeeded { path, .. } => {
                println!("  {} {} {}", "✓".green(), result.task.name, path.display().to_string().dimmed());
            }
            TaskOutcome::Failed { kind, cause } => {
                println!("  {} {} [{}] {}", "✗".red(), result.task.name, kind.to_string().red(), cause);
                println!("      {}", kind.recovery_hint().dimmed());
            }
        }
    }

    println!();
    println!(
        "{} succeeded, {} failed; history: {}",
        report.succeeded().to_string().green(),
        report.failed().to_string().red(),
        report.history_path.display()
    );
}

fn cmd_templates() -> Result<()> {
    debug!("cmd_templates: called");
    let registry = TemplateRegistry::builtin().map_err(with_hint)?;
    for info in registry.list() {
        println!("{:<24} {} ({} tasks)", info.id.cyan(), info.name, info.num_tasks);
        println!("{:<24} {}", "", info.description.dimmed());
    }
    Ok(())
}

fn cmd_suggest(file: &Path) -> Result<()> {
    debug!(?file, "cmd_suggest: called");
    let text = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;
    validate_text(&text).map_err(with_hint)?;
    let registry = TemplateRegistry::builtin().map_err(with_hint)?;
    println!("{}", registry.suggest(&text));
    Ok(())
}

fn cmd_history(config: &Config, count: usize) -> Result<()> {
    debug!(count, "cmd_history: called");
    let workdir = std::env::current_dir().context("Failed to get current directory")?;
    let recorder = HistoryRecorder::new(workdir.join(&config.storage.history_dir));
    let runs = recorder.recent(count).map_err(with_hint)?;

    if runs.is_empty() {
        println!("No runs recorded in {}", recorder.dir().display());
        return Ok(());
    }

    for run in runs {
        let record = &run.record;
        println!(
            "{}  {}  {}/{} succeeded",
            record.timestamp.dimmed(),
            record.workflow_name.cyan(),
            record.succeeded(),
            record.num_tasks
        );
        for file in &record.output_files {
            println!("    {}", file);
        }
        for failure in &record.failures {
            println!("    {} {} [{}]", "✗".red(), failure.task_id, failure.kind);
        }
    }
    Ok(())
}

fn cmd_export(template_id: &str, output: Option<&Path>) -> Result<()> {
    debug!(%template_id, ?output, "cmd_export: called");
    let registry = TemplateRegistry::builtin().map_err(with_hint)?;
    let workflow = registry.get(template_id).map_err(with_hint)?;
    match output {
        Some(path) => {
            workflow.export(path).map_err(with_hint)?;
            println!("{} Exported {} to {}", "✓".green(), template_id, path.display());
        }
        None => println!("{}", workflow.to_json_pretty().map_err(with_hint)?),
    }
    Ok(())
}
