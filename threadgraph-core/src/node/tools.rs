use super::{Context, Node};
use crate::tool::ToolRegistry;
use crate::types::{ChatState, Message, NodeResult, ToolStatus};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Tool execution phase: answers every pending tool call of the thread.
#[derive(Debug, Clone)]
pub struct ToolNode {
    name: String,
    registry: Arc<ToolRegistry>,
}

impl ToolNode {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            name: "tools".to_string(),
            registry,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }
}

/// Text results are passed through, anything else as JSON.
fn render(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn process(&self, ctx: &Context, state: &ChatState) -> NodeResult {
        let calls = state.pending_tool_calls();
        let results = join_all(calls.iter().map(|call| {
            info!(thread_id = %ctx.thread_id, tool = %call.name, call_id = %call.id, "invoking tool");
            self.registry.invoke(&call.name, call.args.clone())
        }))
        .await;

        Ok(calls
            .iter()
            .zip(results)
            .map(|(call, result)| match result {
                Ok(value) => Message::tool(&call.id, render(value), ToolStatus::Success),
                Err(e) => {
                    warn!(thread_id = %ctx.thread_id, tool = %call.name, error = %e, "tool failed");
                    Message::tool(
                        &call.id,
                        json!({ "error": e.to_string() }).to_string(),
                        ToolStatus::Error,
                    )
                }
            })
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
