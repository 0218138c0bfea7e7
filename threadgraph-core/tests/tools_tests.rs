use serde::{Deserialize, Serialize};
use serde_json::json;
use threadgraph_core::prelude::*;
use threadgraph_macros::tools;

/// Arguments of the word counter
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CountParams {
    /// Text to count words in
    text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    words: usize,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct EchoParams {
    message: String,
    #[serde(default)]
    shout: bool,
}

#[derive(Clone, Default)]
struct TextTools;

#[tools(
    count_words = "Counts whitespace-separated words",
    echo = "Repeats the message back"
)]
impl TextTools {
    async fn count_words(&self, params: CountParams) -> Result<CountResponse, ToolError> {
        if params.text.is_empty() {
            return Err(ToolError::InvalidArguments("text is empty".into()));
        }
        Ok(CountResponse {
            words: params.text.split_whitespace().count(),
        })
    }

    async fn echo(&self, params: EchoParams) -> String {
        if params.shout {
            params.message.to_uppercase()
        } else {
            params.message
        }
    }

    // Not listed in the attribute, so not a tool
    #[allow(dead_code)]
    fn helper(&self) -> usize {
        0
    }
}

#[tokio::test]
async fn test_generated_tool_executes() {
    let tool = TextToolsCountWords(TextTools);
    assert_eq!(<TextToolsCountWords as ToolFunction>::name(), "count_words");
    assert_eq!(
        <TextToolsCountWords as ToolFunction>::description(),
        "Counts whitespace-separated words"
    );

    let result = tool
        .execute(CountParams {
            text: "one two  three".into(),
        })
        .await
        .unwrap();
    assert_eq!(result.words, 3);

    let err = tool
        .execute(CountParams {
            text: String::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

#[test]
fn test_generated_schema() {
    let schema = <TextToolsCountWords as ToolFunction>::get_schema();
    assert_eq!(schema.name, "count_words");
    assert_eq!(schema.parameters["type"], "object");
    assert_eq!(schema.parameters["properties"]["text"]["type"], "string");
    assert_eq!(schema.parameters["required"], json!(["text"]));
    assert!(schema.parameters.get("$schema").is_none());
}

#[tokio::test]
async fn test_generated_tools_in_registry() {
    let registry = ToolRegistry::new()
        .with_tool(TextToolsCountWords(TextTools))
        .with_tool(TextToolsEcho(TextTools));

    assert_eq!(registry.len(), 2);
    let names: Vec<_> = registry.schemas().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["count_words", "echo"]);

    let counted = registry
        .invoke("count_words", json!({ "text": "a b" }))
        .await
        .unwrap();
    assert_eq!(counted, json!({ "words": 2 }));

    let echoed = registry
        .invoke("echo", json!({ "message": "hi", "shout": true }))
        .await
        .unwrap();
    assert_eq!(echoed, json!("HI"));

    let err = registry
        .invoke("echo", json!({ "shout": true }))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));
}

#[tokio::test]
async fn test_standard_registry_calculator() {
    let registry = ToolRegistry::standard(StandardTools::default());
    let names: Vec<_> = registry.schemas().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["duckduckgo_search", "calculator", "get_stock_price"]);

    let result = registry
        .invoke(
            "calculator",
            json!({ "first_num": 3, "second_num": 10, "operation": "subtract" }),
        )
        .await
        .unwrap();
    assert_eq!(result["result"], 7.0);
    assert_eq!(result["operation"], "subtract");

    let err = registry
        .invoke(
            "calculator",
            json!({ "first_num": 1, "second_num": 2, "operation": "modulo" }),
        )
        .await
        .unwrap_err();
    assert_eq!(err, ToolError::InvalidArguments("Invalid operation: modulo".into()));
}
