//! Planning pipeline
//!
//! `Planner` wires the pieces together for one run: validate and chunk the
//! document, replace the index, pick or generate a workflow, execute it and
//! record the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use contextstore::ContextStore;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Document, RunRecord, TaskResult, Workflow};
use crate::error::PlanError;
use crate::executor::TaskExecutor;
use crate::generator::WorkflowGenerator;
use crate::history::HistoryRecorder;
use crate::llm::{InferenceCaller, LlmClient, create_client};
use crate::output::OutputWriter;
use crate::prompts::PromptLoader;
use crate::retrieval::{Retriever, StoreRetriever};
use crate::run::RunContext;
use crate::templates::TemplateRegistry;

/// How the run's workflow is chosen
#[derive(Debug, Clone)]
pub enum WorkflowSelection {
    /// A named builtin template
    Template(String),
    /// The template whose keywords best match the document
    Suggest,
    /// Ask the model; on failure optionally fall back to the suggested template
    Generate { goal: Option<String>, fallback: bool },
    /// A workflow supplied by the caller, e.g. a previous export
    Provided(Workflow),
}

/// Everything needed to start one run
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub documents: Vec<Document>,
    pub selection: WorkflowSelection,
    /// Also write the chosen workflow here before executing it
    pub export_workflow: Option<PathBuf>,
}

/// Outcome of a finished run
#[derive(Debug)]
pub struct RunReport {
    pub workflow: Workflow,
    pub template_id: Option<String>,
    pub results: Vec<TaskResult>,
    pub record: RunRecord,
    pub history_path: PathBuf,
    /// Set when generation failed and a template was used instead
    pub fallback_reason: Option<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn output_paths(&self) -> Vec<PathBuf> {
        self.results.iter().filter_map(|r| r.output_path().cloned()).collect()
    }
}

/// Owns the collaborators of a planning run
pub struct Planner {
    config: Config,
    caller: InferenceCaller,
    retriever: Box<dyn Retriever>,
    registry: TemplateRegistry,
    prompts: PromptLoader,
    writer: OutputWriter,
    history: HistoryRecorder,
}

impl Planner {
    /// Assemble a planner from explicit collaborators
    pub fn new(
        config: Config,
        client: Arc<dyn LlmClient>,
        retriever: Box<dyn Retriever>,
        prompts: PromptLoader,
    ) -> Result<Self, PlanError> {
        debug!("Planner::new: called");
        config.validate()?;

        let json_instruction = prompts.json_instruction().map_err(|e| PlanError::Prompt(e.to_string()))?;
        let caller = InferenceCaller::new(client, &config.llm)
            .with_max_tool_rounds(config.retrieval.max_tool_rounds)
            .with_json_instruction(json_instruction);

        Ok(Self {
            writer: OutputWriter::new(config.storage.output_dir.clone()),
            history: HistoryRecorder::new(config.storage.history_dir.clone()),
            registry: TemplateRegistry::builtin()?,
            config,
            caller,
            retriever,
            prompts,
        })
    }

    /// Build the production planner rooted at `workdir`
    ///
    /// Relative storage paths in the config are resolved against `workdir`.
    pub fn from_config(mut config: Config, workdir: &Path) -> Result<Self, PlanError> {
        debug!(?workdir, "Planner::from_config: called");
        config.validate()?;
        for dir in [
            &mut config.storage.output_dir,
            &mut config.storage.history_dir,
            &mut config.storage.store_dir,
        ] {
            if dir.is_relative() {
                *dir = workdir.join(&*dir);
            }
        }

        let client = create_client(&config.llm)?;
        let store = ContextStore::open(&config.storage.store_dir)
            .map_err(|e| PlanError::ContextStore(format!("{e:#}")))?;
        Self::new(
            config,
            client,
            Box::new(StoreRetriever::new(store)),
            PromptLoader::new(workdir),
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    /// Run the whole pipeline for one request
    pub async fn plan(&self, request: PlanRequest) -> Result<RunReport, PlanError> {
        debug!(documents = %request.documents.len(), selection = ?request.selection, "Planner::plan: called");
        let document = Document::join(request.documents)?;
        info!(source = %document.source(), chars = %document.char_len(), "Planning from document");

        let chunks = document.chunks(self.config.chunking.chunk_size, self.config.chunking.chunk_overlap)?;
        let indexed = self.retriever.replace(document.source(), &chunks)?;
        info!(%indexed, "Indexed document chunks");

        let (workflow, template_id, fallback_reason) = self.select_workflow(&document, request.selection).await?;
        if let Some(path) = &request.export_workflow {
            workflow.export(path)?;
            info!(path = %path.display(), "Exported workflow");
        }

        let mut run = RunContext::new(
            self.config.clone(),
            workflow,
            template_id,
            Local::now().date_naive(),
        );
        TaskExecutor::new(&self.caller, &self.prompts, self.retriever.as_ref(), &self.writer)
            .execute(&mut run)
            .await;

        let stored = self
            .history
            .record(run.workflow(), &run.output_paths(), &run.failures(), Local::now())?;
        let (workflow, template_id, results) = run.into_parts();

        Ok(RunReport {
            workflow,
            template_id,
            results,
            record: stored.record,
            history_path: stored.path,
            fallback_reason,
        })
    }

    /// Resolve the selection to a workflow and, for templates, its id
    async fn select_workflow(
        &self,
        document: &Document,
        selection: WorkflowSelection,
    ) -> Result<(Workflow, Option<String>, Option<String>), PlanError> {
        match selection {
            WorkflowSelection::Template(id) => Ok((self.registry.get(&id)?, Some(id), None)),
            WorkflowSelection::Suggest => {
                let id = self.registry.suggest(document.text()).to_string();
                Ok((self.registry.get(&id)?, Some(id), None))
            }
            WorkflowSelection::Provided(workflow) => {
                workflow.validate()?;
                Ok((workflow, None, None))
            }
            WorkflowSelection::Generate { goal, fallback } => {
                let generator = WorkflowGenerator::new(
                    &self.caller,
                    &self.prompts,
                    self.retriever.as_ref(),
                    &self.config.retrieval,
                    &self.config.generation,
                );
                let context = generator.generation_context()?;
                match generator.generate(&context, goal.as_deref()).await {
                    Ok(workflow) => Ok((workflow, None, None)),
                    Err(e @ (PlanError::InvalidWorkflowStructure(_) | PlanError::Inference(_))) if fallback => {
                        let id = self.registry.suggest(document.text()).to_string();
                        warn!(error = %e, template = %id, "Workflow generation failed, falling back to template");
                        Ok((self.registry.get(&id)?, Some(id), Some(e.to_string())))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}
