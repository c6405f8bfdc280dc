//! Template catalog
//!
//! Builtin templates are embedded YAML, parsed once when the registry is
//! built. The catalog is read-only afterwards.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{OutputFormat, TaskDescriptor, Workflow};
use crate::error::PlanError;

const BUILTIN_SOFTWARE: &str = include_str!("builtin/software_development.yml");
const BUILTIN_MARKETING: &str = include_str!("builtin/marketing_campaign.yml");
const BUILTIN_RESEARCH: &str = include_str!("builtin/research_project.yml");
const BUILTIN_EVENT: &str = include_str!("builtin/event_planning.yml");
const BUILTIN_STRATEGY: &str = include_str!("builtin/business_strategy.yml");

/// Template chosen when no keyword matches
pub const FALLBACK_TEMPLATE: &str = "software_development";

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("valid word regex"));

/// A template as written in YAML
#[derive(Debug, Deserialize)]
struct TemplateFile {
    id: String,
    name: String,
    description: String,
    #[serde(rename = "workflow-name")]
    workflow_name: String,
    #[serde(default)]
    keywords: Vec<String>,
    tasks: Vec<TemplateTask>,
}

#[derive(Debug, Deserialize)]
struct TemplateTask {
    #[serde(rename = "task-id")]
    task_id: String,
    name: String,
    prompt: String,
    #[serde(rename = "output-format")]
    output_format: OutputFormat,
}

/// A reusable workflow for a common project category
#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub workflow: Workflow,
}

impl Template {
    fn from_yaml(yaml: &str) -> Result<Self, PlanError> {
        let file: TemplateFile = serde_yaml::from_str(yaml)
            .map_err(|e| PlanError::InvalidWorkflowStructure(format!("template YAML: {e}")))?;
        debug!(id = %file.id, "Template::from_yaml: parsed");

        let tasks = file
            .tasks
            .into_iter()
            .map(|t| TaskDescriptor::new(t.task_id, t.name, t.prompt, t.output_format))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: file.id,
            name: file.name,
            description: file.description,
            keywords: file.keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            workflow: Workflow::new(file.workflow_name, tasks)?,
        })
    }

    /// Number of distinct keywords that appear in `words`, alone or with a plural `s`
    fn score(&self, words: &HashSet<&str>) -> usize {
        self.keywords
            .iter()
            .filter(|k| words.contains(k.as_str()) || words.contains(format!("{k}s").as_str()))
            .count()
    }
}

/// Listing entry for a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub num_tasks: usize,
}

/// The fixed catalog of builtin templates, in display order
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    /// Parse the embedded templates
    pub fn builtin() -> Result<Self, PlanError> {
        debug!("TemplateRegistry::builtin: called");
        let templates = [
            BUILTIN_SOFTWARE,
            BUILTIN_MARKETING,
            BUILTIN_RESEARCH,
            BUILTIN_EVENT,
            BUILTIN_STRATEGY,
        ]
        .into_iter()
        .map(Template::from_yaml)
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    pub fn list(&self) -> Vec<TemplateInfo> {
        self.templates
            .iter()
            .map(|t| TemplateInfo {
                id: t.id.clone(),
                name: t.name.clone(),
                description: t.description.clone(),
                num_tasks: t.workflow.len(),
            })
            .collect()
    }

    pub fn template(&self, template_id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == template_id)
    }

    /// The workflow of template `template_id`
    pub fn get(&self, template_id: &str) -> Result<Workflow, PlanError> {
        debug!(%template_id, "TemplateRegistry::get: called");
        self.template(template_id)
            .map(|t| t.workflow.clone())
            .ok_or_else(|| PlanError::NotFound(format!("template '{template_id}'")))
    }

    /// Pick the template whose keywords best match `text`
    ///
    /// Scores count distinct keywords present as whole words, singular or
    /// with a trailing `s`. Ties go to the earlier template.
    pub fn suggest(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        let words: HashSet<&str> = WORD.find_iter(&lowered).map(|m| m.as_str()).collect();

        let mut best: Option<(&Template, usize)> = None;
        for template in &self.templates {
            let score = template.score(&words);
            debug!(id = %template.id, %score, "TemplateRegistry::suggest: scored");
            if score > 0 && best.is_none_or(|(_, s)| score > s) {
                best = Some((template, score));
            }
        }

        let id = best.map(|(t, _)| t.id.as_str()).unwrap_or(FALLBACK_TEMPLATE);
        info!(template = %id, "Suggested template");
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TemplateRegistry {
        TemplateRegistry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_catalog() {
        let list = registry().list();
        let ids: Vec<&str> = list.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "software_development",
                "marketing_campaign",
                "research_project",
                "event_planning",
                "business_strategy"
            ]
        );
        assert_eq!(list[0].num_tasks, 7);
        assert!(list[1..].iter().all(|t| t.num_tasks == 5));
    }

    #[test]
    fn test_software_tasks_in_order() {
        let workflow = registry().get("software_development").unwrap();
        let names: Vec<&str> = workflow.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "requirements_analysis",
                "architecture_design",
                "work_breakdown_structure",
                "task_list_with_dependencies",
                "sprint_planning",
                "resource_allocation",
                "risk_assessment"
            ]
        );
        assert_eq!(workflow.tasks[3].output_format, OutputFormat::Csv);
        assert_eq!(workflow.workflow_name, "Software Development Planning Workflow");
        assert!(!workflow.tasks[0].prompt.ends_with('\n'));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        assert!(matches!(registry().get("gardening"), Err(PlanError::NotFound(_))));
    }

    #[test]
    fn test_suggest_software_keywords() {
        let text = "We need a software application with an API and a database.";
        assert_eq!(registry().suggest(text), "software_development");
    }

    #[test]
    fn test_suggest_each_domain() {
        let r = registry();
        assert_eq!(r.suggest("A marketing campaign to grow our brand through advertising"), "marketing_campaign");
        assert_eq!(r.suggest("A research study testing the hypothesis with a new methodology"), "research_project");
        assert_eq!(r.suggest("Annual conference: venue booking for 300 attendees"), "event_planning");
        assert_eq!(r.suggest("Competitive strategy for business growth"), "business_strategy");
    }

    #[test]
    fn test_suggest_matches_plural_keywords() {
        let r = registry();
        assert_eq!(r.suggest("Several databases behind two public APIs"), "software_development");
        assert_eq!(r.suggest("Quarterly meetings with attendees"), "event_planning");
        // a singular keyword never matches a word missing its final letter
        assert_eq!(r.suggest("busines plans"), FALLBACK_TEMPLATE);
    }

    #[test]
    fn test_suggest_fallback_when_nothing_matches() {
        assert_eq!(registry().suggest("Plant tomatoes in the spring garden"), FALLBACK_TEMPLATE);
        assert_eq!(registry().suggest(""), FALLBACK_TEMPLATE);
    }

    #[test]
    fn test_suggest_highest_score_wins() {
        // one software keyword against three event keywords
        let text = "Event at a conference venue with a registration system";
        assert_eq!(registry().suggest(text), "event_planning");
    }

    #[test]
    fn test_suggest_tie_goes_to_registry_order() {
        assert_eq!(registry().suggest("campaign event"), "marketing_campaign");
    }
}
