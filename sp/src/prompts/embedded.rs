//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Template task prompt plus retrieved project context
pub const ENHANCE: &str = include_str!("../../prompts/enhance.pmt");

/// Generated task prompt plus context and output format directive
pub const TASK: &str = include_str!("../../prompts/task.pmt");

/// Workflow generation request
pub const WORKFLOW: &str = include_str!("../../prompts/workflow.pmt");

/// Strict JSON suffix for JSON-mode calls
pub const JSON_MODE: &str = include_str!("../../prompts/json-mode.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "enhance" => Some(ENHANCE),
        "task" => Some(TASK),
        "workflow" => Some(WORKFLOW),
        "json-mode" => Some(JSON_MODE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
