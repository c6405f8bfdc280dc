//! Per-run state
//!
//! One [`RunContext`] is built per invocation and passed through every
//! step. It owns the active workflow, the ordered list of outputs later
//! tasks can see, and each task's state and result.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::{PriorOutput, TaskFailure, TaskOutcome, TaskResult, TaskState, Workflow};

/// State of one planning run
#[derive(Debug)]
pub struct RunContext {
    config: Config,
    workflow: Workflow,
    template_id: Option<String>,
    date: NaiveDate,
    outputs: Vec<PriorOutput>,
    states: Vec<TaskState>,
    results: Vec<TaskResult>,
}

impl RunContext {
    pub fn new(config: Config, workflow: Workflow, template_id: Option<String>, date: NaiveDate) -> Self {
        debug!(workflow_name = %workflow.workflow_name, ?template_id, "RunContext::new: called");
        let states = vec![TaskState::Pending; workflow.len()];
        Self {
            config,
            workflow,
            template_id,
            date,
            outputs: Vec::new(),
            states,
            results: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Template the workflow came from; `None` for generated workflows
    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Outputs of succeeded tasks, in execution order
    pub fn prior_outputs(&self) -> &[PriorOutput] {
        &self.outputs
    }

    pub fn state(&self, index: usize) -> Option<TaskState> {
        self.states.get(index).copied()
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    pub(crate) fn start_task(&mut self, index: usize) {
        self.transition(index, TaskState::Running);
    }

    /// Store a finished task; succeeded output becomes visible to later tasks
    pub(crate) fn finish_task(&mut self, index: usize, result: TaskResult) {
        self.transition(index, result.state());
        if let TaskOutcome::Succeeded { content, .. } = &result.outcome {
            self.outputs.push(PriorOutput::new(result.task.task_id.clone(), content.clone()));
        }
        self.results.push(result);
    }

    fn transition(&mut self, index: usize, next: TaskState) {
        let Some(state) = self.states.get_mut(index) else {
            warn!(%index, "RunContext::transition: no such task");
            return;
        };
        if !state.can_transition_to(next) {
            warn!(%index, from = %state, to = %next, "Unexpected task state transition");
        }
        *state = next;
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn output_paths(&self) -> Vec<std::path::PathBuf> {
        self.results.iter().filter_map(|r| r.output_path().cloned()).collect()
    }

    pub fn failures(&self) -> Vec<TaskFailure> {
        self.results
            .iter()
            .filter_map(|r| match &r.outcome {
                TaskOutcome::Failed { kind, cause } => Some(TaskFailure {
                    task_id: r.task.task_id.clone(),
                    kind: *kind,
                    cause: cause.clone(),
                }),
                TaskOutcome::Succeeded { .. } => None,
            })
            .collect()
    }

    /// Split into the workflow and its results once the run is over
    pub fn into_parts(self) -> (Workflow, Option<String>, Vec<TaskResult>) {
        (self.workflow, self.template_id, self.results)
    }
}
