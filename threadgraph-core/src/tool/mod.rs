mod registry;
mod standard;

pub use registry::ToolRegistry;
pub use standard::{
    calculate, CalculatorParams, CalculatorResponse, SearchParams, StandardTools,
    StandardToolsCalculator, StandardToolsConfig, StandardToolsDuckduckgoSearch,
    StandardToolsGetStockPrice, StockPriceParams,
};

pub use schemars::JsonSchema;

use crate::types::ToolError;
use async_trait::async_trait;
use schemars::gen::SchemaSettings;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// What the model sees of a tool: name, when to use it, and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    pub parameters: Value,
}

/// A typed tool. Usually implemented through `#[tools(...)]`.
#[async_trait]
pub trait ToolFunction: Send + Sync {
    /// The parameter type for the tool
    type Params: schemars::JsonSchema + DeserializeOwned + Send;
    /// The response type for the tool
    type Response: Serialize + Send;

    /// Get the name of the tool
    fn name() -> &'static str;

    /// Get a description of what the tool does
    fn description() -> &'static str;

    /// Get the JSON Schema for the tool's parameters
    fn parameters_schema() -> Value {
        let generator = SchemaSettings::draft07()
            .with(|settings| {
                settings.inline_subschemas = true;
                settings.meta_schema = None;
            })
            .into_generator();
        let schema = generator.into_root_schema_for::<Self::Params>();
        serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({ "type": "object" }))
    }

    /// Get the complete tool descriptor
    fn get_schema() -> ToolSchema {
        ToolSchema {
            name: Self::name().to_string(),
            description: Self::description().to_string(),
            parameters: Self::parameters_schema(),
        }
    }

    /// Execute the tool with the given parameters
    async fn execute(&self, params: Self::Params) -> Result<Self::Response, ToolError>;
}

/// Object-safe view of a tool working on raw JSON, as stored in a [`ToolRegistry`].
#[async_trait]
pub trait DynTool: Send + Sync {
    fn schema(&self) -> ToolSchema;

    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

#[async_trait]
impl<T> DynTool for T
where
    T: ToolFunction,
{
    fn schema(&self) -> ToolSchema {
        T::get_schema()
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let params: T::Params = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let response = self.execute(params).await?;
        serde_json::to_value(response).map_err(|e| ToolError::Serialization(e.to_string()))
    }
}
