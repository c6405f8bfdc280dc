//! Retrieval boundary
//!
//! The planner talks to the context store only through [`Retriever`], so
//! tests can substitute a failing or canned store.

use async_trait::async_trait;
use contextstore::{Chunk, ContextStore, RankedChunk};
use tracing::debug;

use crate::context::CONTEXT_SEPARATOR;
use crate::error::PlanError;
use crate::llm::{ToolDefinition, ToolHandler};

/// Name of the document query tool offered to the model
pub const QUERY_TOOL_NAME: &str = "query_project_documents";

/// Index and query the current document's chunks
pub trait Retriever: Send + Sync {
    /// Drop whatever is indexed and index `chunks` in its place
    fn replace(&self, source: &str, chunks: &[Chunk]) -> Result<usize, PlanError>;

    /// Top `top_k` chunks for `text`, most relevant first
    fn query(&self, text: &str, top_k: usize) -> Result<Vec<RankedChunk>, PlanError>;
}

/// [`Retriever`] backed by an on-disk [`ContextStore`]
pub struct StoreRetriever {
    store: ContextStore,
}

impl StoreRetriever {
    pub fn new(store: ContextStore) -> Self {
        Self { store }
    }

    fn with_store<T>(&self, f: impl FnOnce(&ContextStore) -> eyre::Result<T>) -> Result<T, PlanError> {
        f(&self.store).map_err(|e| PlanError::ContextStore(format!("{e:#}")))
    }
}

impl Retriever for StoreRetriever {
    fn replace(&self, source: &str, chunks: &[Chunk]) -> Result<usize, PlanError> {
        debug!(%source, chunk_count = %chunks.len(), "StoreRetriever::replace: called");
        self.with_store(|store| {
            store.clear()?;
            store.index(source, chunks)
        })
    }

    fn query(&self, text: &str, top_k: usize) -> Result<Vec<RankedChunk>, PlanError> {
        debug!(%top_k, "StoreRetriever::query: called");
        self.with_store(|store| store.query(text, top_k))
    }
}

/// Lets the model search the indexed document mid-call
pub struct DocumentQueryTool<'a> {
    retriever: &'a dyn Retriever,
    default_top_k: usize,
}

impl<'a> DocumentQueryTool<'a> {
    pub fn new(retriever: &'a dyn Retriever, default_top_k: usize) -> Self {
        Self {
            retriever,
            default_top_k,
        }
    }
}

/// Render query results as numbered, scored passages
pub fn format_results(results: &[RankedChunk]) -> String {
    if results.is_empty() {
        return "No relevant passages found.".to_string();
    }
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Result {}] (Relevance: {:.2})\n{}", i + 1, r.score, r.text))
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

#[async_trait]
impl ToolHandler for DocumentQueryTool<'_> {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            QUERY_TOOL_NAME,
            "Search the uploaded project specification for passages relevant to a query. \
             Use this to look up requirements, constraints, budgets or timelines.",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look for in the project documents"
                    },
                    "top_k": {
                        "type": "integer",
                        "description": "Number of passages to return",
                        "minimum": 1,
                        "maximum": 10
                    }
                },
                "required": ["query"]
            }),
        )
    }

    async fn invoke(&self, input: &serde_json::Value) -> eyre::Result<String> {
        let query = input["query"]
            .as_str()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| eyre::eyre!("missing 'query' argument"))?;
        let top_k = input["top_k"]
            .as_u64()
            .map(|k| k.clamp(1, 10) as usize)
            .unwrap_or(self.default_top_k);
        debug!(%query, %top_k, "DocumentQueryTool::invoke: called");

        let results = self.retriever.query(query, top_k)?;
        Ok(format_results(&results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn retriever(dir: &TempDir) -> StoreRetriever {
        StoreRetriever::new(ContextStore::open(dir.path().join("store")).unwrap())
    }

    #[test]
    fn test_replace_discards_previous_document() {
        let dir = TempDir::new().unwrap();
        let r = retriever(&dir);
        let first = contextstore::chunk("budget for the marketing launch", 100, 10).unwrap();
        let second = contextstore::chunk("venue and catering for the conference", 100, 10).unwrap();

        r.replace("a.md", &first).unwrap();
        r.replace("b.md", &second).unwrap();

        let hits = r.query("budget marketing", 5).unwrap();
        assert!(hits.iter().all(|h| h.source == "b.md"));
    }

    #[test]
    fn test_format_results() {
        let results = vec![
            RankedChunk {
                chunk_id: "0001".to_string(),
                source: "spec.md".to_string(),
                text: "Budget is 50k".to_string(),
                score: 0.8123,
            },
            RankedChunk {
                chunk_id: "0002".to_string(),
                source: "spec.md".to_string(),
                text: "Launch in May".to_string(),
                score: 0.5,
            },
        ];
        assert_eq!(
            format_results(&results),
            "[Result 1] (Relevance: 0.81)\nBudget is 50k\n\n---\n\n[Result 2] (Relevance: 0.50)\nLaunch in May"
        );
        assert_eq!(format_results(&[]), "No relevant passages found.");
    }

    #[tokio::test]
    async fn test_query_tool_invokes_retriever() {
        let dir = TempDir::new().unwrap();
        let r = retriever(&dir);
        let chunks = contextstore::chunk("The project budget is fifty thousand dollars.", 100, 10).unwrap();
        r.replace("spec.md", &chunks).unwrap();

        let tool = DocumentQueryTool::new(&r, 3);
        assert_eq!(tool.definition().name, QUERY_TOOL_NAME);

        let out = tool.invoke(&serde_json::json!({"query": "budget"})).await.unwrap();
        assert!(out.starts_with("[Result 1]"));
        assert!(out.contains("fifty thousand"));

        assert!(tool.invoke(&serde_json::json!({})).await.is_err());
    }
}
