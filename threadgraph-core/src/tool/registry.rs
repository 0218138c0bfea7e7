use super::{DynTool, StandardTools, StandardToolsCalculator, StandardToolsDuckduckgoSearch,
    StandardToolsGetStockPrice, ToolSchema};
use crate::types::ToolError;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

/// Fixed set of tools the model may call, looked up by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DynTool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the calculator, web search and stock price tools.
    pub fn standard(tools: StandardTools) -> Self {
        Self::new()
            .with_tool(StandardToolsDuckduckgoSearch(tools.clone()))
            .with_tool(StandardToolsCalculator(tools.clone()))
            .with_tool(StandardToolsGetStockPrice(tools))
    }

    /// Add a tool; a tool with the same name is replaced in place.
    pub fn register<T>(&mut self, tool: T) -> &mut Self
    where
        T: DynTool + 'static,
    {
        let name = tool.schema().name;
        let tool: Arc<dyn DynTool> = Arc::new(tool);
        match self.index.get(&name) {
            Some(&pos) => self.tools[pos] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
        self
    }

    pub fn with_tool<T>(mut self, tool: T) -> Self
    where
        T: DynTool + 'static,
    {
        self.register(tool);
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Descriptors of every tool in registration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|tool| tool.schema()).collect()
    }

    /// Run the named tool. No retries.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let pos = self
            .index
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        self.tools[*pos].call(args).await
    }
}

impl Debug for ToolRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut names: Vec<&String> = self.index.keys().collect();
        names.sort();
        f.debug_struct("ToolRegistry").field("tools", &names).finish()
    }
}
