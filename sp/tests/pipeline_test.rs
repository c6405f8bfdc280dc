//! End-to-end tests for the planning pipeline
//!
//! A scripted model stands in for the provider; indexing, retrieval, output
//! files and history all use the real implementations in a temp directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use contextstore::ContextStore;
use specplan::config::Config;
use specplan::domain::{Document, OutputFormat, TaskDescriptor, Workflow};
use specplan::error::{PlanError, TaskErrorKind};
use specplan::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError};
use specplan::planner::{PlanRequest, Planner, WorkflowSelection};
use specplan::prompts::PromptLoader;
use specplan::retrieval::StoreRetriever;
use tempfile::TempDir;

const JSON_MARKER: &str = "CRITICAL FORMATTING INSTRUCTIONS";
const FAIL_MARKER: &str = "FAIL_THIS_TASK";

const TASK_REPLY: &str = "item,owner,notes\nbackend api,platform team,first milestone";

/// Model stub: JSON-mode prompts get `workflow_reply`, prompts with the
/// failure marker get a server error, everything else a small table
struct ScriptedClient {
    workflow_reply: String,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(workflow_reply: &str) -> Arc<Self> {
        Arc::new(Self {
            workflow_reply: workflow_reply.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.messages.first().map(|m| m.content.text()).unwrap_or_default();
        if prompt.contains(JSON_MARKER) {
            Ok(CompletionResponse::text(self.workflow_reply.clone()))
        } else if prompt.contains(FAIL_MARKER) {
            Err(LlmError::ApiError {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        } else {
            Ok(CompletionResponse::text(TASK_REPLY))
        }
    }
}

fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.llm.max_retries = 2;
    config.llm.initial_backoff_ms = 0;
    config.llm.max_backoff_ms = 0;
    config.retrieval.max_tool_rounds = 0;
    config.storage.output_dir = root.join("outputs");
    config.storage.history_dir = root.join("history");
    config.storage.store_dir = root.join("store");
    config
}

fn planner(root: &Path, client: Arc<ScriptedClient>) -> Planner {
    let config = test_config(root);
    let store = ContextStore::open(&config.storage.store_dir).unwrap();
    Planner::new(
        config,
        client,
        Box::new(StoreRetriever::new(store)),
        PromptLoader::embedded_only(),
    )
    .unwrap()
}

fn software_spec() -> Document {
    let paragraph = "We are building a software application with a REST api and a relational database. \
                     The system tracks customer orders, invoices and shipments for a small retailer. ";
    Document::new("spec.md", paragraph.repeat(12)).unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

fn task(id: &str, prompt: &str) -> TaskDescriptor {
    TaskDescriptor::new(id, format!("task_{id}"), prompt, OutputFormat::Markdown).unwrap()
}

#[tokio::test]
async fn test_template_run_writes_every_output_and_one_record() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::new("{}");
    let planner = planner(temp.path(), client.clone());

    let report = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Template("software_development".to_string()),
            export_workflow: None,
        })
        .await
        .unwrap();

    assert_eq!(report.template_id.as_deref(), Some("software_development"));
    assert_eq!(report.results.len(), 7);
    assert_eq!(report.succeeded(), 7);
    assert_eq!(client.calls(), 7);

    let outputs = files_in(&temp.path().join("outputs"));
    assert_eq!(outputs.len(), 7);
    assert!(outputs.iter().any(|f| f.ends_with("-requirements_analysis-rev0.md")));
    assert!(outputs.iter().any(|f| f.ends_with("-resource_allocation-rev0.csv")));

    let runs = planner.history().recent(10).unwrap();
    assert_eq!(runs.len(), 1);
    let record = &runs[0].record;
    assert_eq!(record.num_tasks, 7);
    assert_eq!(record.output_files.len(), 7);
    assert!(record.failures.is_empty());
    assert_eq!(record.workflow_name, "Software Development Planning Workflow");
}

#[tokio::test]
async fn test_repeated_runs_never_overwrite_outputs() {
    let temp = TempDir::new().unwrap();
    let planner = planner(temp.path(), ScriptedClient::new("{}"));

    for _ in 0..2 {
        planner
            .plan(PlanRequest {
                documents: vec![software_spec()],
                selection: WorkflowSelection::Suggest,
                export_workflow: None,
            })
            .await
            .unwrap();
    }

    let outputs = files_in(&temp.path().join("outputs"));
    assert_eq!(outputs.len(), 14);
    assert!(outputs.iter().any(|f| f.ends_with("-risk_assessment-rev0.md")));
    assert!(outputs.iter().any(|f| f.ends_with("-risk_assessment-rev1.md")));
    assert_eq!(planner.history().recent(10).unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_task_is_recorded_and_run_continues() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::new("{}");
    let planner = planner(temp.path(), client.clone());

    let workflow = Workflow::new(
        "Five Steps",
        vec![
            task("1", "Summarize the goals"),
            task("2", "List the components"),
            task("3", FAIL_MARKER),
            task("4", "Plan the milestones"),
            task("5", "Assess the risks"),
        ],
    )
    .unwrap();

    let report = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Provided(workflow),
            export_workflow: None,
        })
        .await
        .unwrap();

    assert_eq!(report.template_id, None);
    assert_eq!(report.succeeded(), 4);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.results[2].error_kind(), Some(TaskErrorKind::AiError));
    // Four successful calls plus two attempts on the failing task
    assert_eq!(client.calls(), 6);

    assert_eq!(report.record.num_tasks, 5);
    assert_eq!(report.record.output_files.len(), 4);
    assert_eq!(report.record.failures.len(), 1);
    assert_eq!(report.record.failures[0].task_id, "3");
    assert_eq!(files_in(&temp.path().join("outputs")).len(), 4);
}

#[tokio::test]
async fn test_generated_workflow_is_run_and_exported() {
    let temp = TempDir::new().unwrap();
    let reply = r#"```json
{
  "workflow_name": "Retail Platform Plan",
  "tasks": [
    {"task_id": "1", "name": "scope", "prompt": "Define the scope", "output_format": "markdown"},
    {"task_id": "2", "name": "backlog", "prompt": "List the backlog", "output_format": "csv"},
    {"task_id": "3", "name": "milestones", "prompt": "Plan milestones", "output_format": "markdown"},
    {"task_id": "4", "name": "risks", "prompt": "List the risks", "output_format": "csv"}
  ]
}
```"#;
    let planner = planner(temp.path(), ScriptedClient::new(reply));
    let export_path = temp.path().join("exported").join("workflow.json");

    let report = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Generate {
                goal: Some("ship the first release".to_string()),
                fallback: false,
            },
            export_workflow: Some(export_path.clone()),
        })
        .await
        .unwrap();

    assert_eq!(report.workflow.workflow_name, "Retail Platform Plan");
    assert_eq!(report.template_id, None);
    assert_eq!(report.succeeded(), 4);
    assert!(report.fallback_reason.is_none());

    let exported = Workflow::import(&export_path).unwrap();
    assert_eq!(exported, report.workflow);
    assert_eq!(report.record.workflow, report.workflow);
}

#[tokio::test]
async fn test_malformed_generation_aborts_before_any_task() {
    let temp = TempDir::new().unwrap();
    let planner = planner(temp.path(), ScriptedClient::new("Sure! Here is a plan without any JSON."));

    let err = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Generate {
                goal: None,
                fallback: false,
            },
            export_workflow: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::InvalidWorkflowStructure(_)), "got {err:?}");
    assert!(files_in(&temp.path().join("outputs")).is_empty());
    assert!(planner.history().recent(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_generation_falls_back_to_suggested_template() {
    let temp = TempDir::new().unwrap();
    let planner = planner(temp.path(), ScriptedClient::new(r#"{"workflow_name": "x", "tasks": []}"#));

    let report = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Generate {
                goal: None,
                fallback: true,
            },
            export_workflow: None,
        })
        .await
        .unwrap();

    assert_eq!(report.template_id.as_deref(), Some("software_development"));
    assert!(report.fallback_reason.is_some());
    assert_eq!(report.succeeded(), 7);
}

#[tokio::test]
async fn test_multiple_documents_are_joined() {
    let temp = TempDir::new().unwrap();
    let planner = planner(temp.path(), ScriptedClient::new("{}"));
    let extra = Document::new("notes.md", "Additional notes about the database schema. ".repeat(5)).unwrap();

    let report = planner
        .plan(PlanRequest {
            documents: vec![software_spec(), extra],
            selection: WorkflowSelection::Template("research_project".to_string()),
            export_workflow: None,
        })
        .await
        .unwrap();

    assert_eq!(report.results.len(), 5);
    assert_eq!(report.succeeded(), 5);
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let temp = TempDir::new().unwrap();
    let planner = planner(temp.path(), ScriptedClient::new("{}"));

    let err = planner
        .plan(PlanRequest {
            documents: vec![software_spec()],
            selection: WorkflowSelection::Template("gardening".to_string()),
            export_workflow: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, PlanError::NotFound(_)), "got {err:?}");
}

#[test]
fn test_document_length_limits() {
    assert!(matches!(Document::new("short.md", "too short"), Err(PlanError::Validation(_))));
    assert!(Document::new("min.md", "a".repeat(100)).is_ok());
    assert!(Document::new("max.md", "a".repeat(100_000)).is_ok());
    assert!(matches!(
        Document::new("huge.md", "a".repeat(100_001)),
        Err(PlanError::Validation(_))
    ));
}
