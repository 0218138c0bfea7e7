use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for tool operations
///
/// These never abort a turn: the tool phase turns them into error-shaped tool
/// messages that are fed back to the model.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Execution: {0}")]
    Execution(String),

    #[error("Serialization: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for ToolError {
    fn from(err: reqwest::Error) -> Self {
        ToolError::Execution(err.to_string())
    }
}

/// Error type for completion provider calls
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ModelError {
    #[error("Provider: {0}")]
    Provider(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<async_openai::error::OpenAIError> for ModelError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        ModelError::Provider(err.to_string())
    }
}

/// Error type for checkpoint store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Io: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt checkpoint data: {0}")]
    Corrupt(String),

    /// A write would break the tool call / tool result pairing of a thread
    #[error("Integrity violation in thread {thread_id}: {reason}")]
    Integrity { thread_id: String, reason: String },
}

/// Error type for node operations
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Node execution: {0}")]
    Execution(String),
}

/// Error type for a whole conversation turn
#[derive(Error, Debug)]
pub enum TurnError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Recursion limit of {0} model calls reached without a final answer")]
    RecursionLimit(usize),

    #[error("Turn cancelled")]
    Cancelled,
}

impl From<ModelError> for TurnError {
    fn from(err: ModelError) -> Self {
        TurnError::Node(NodeError::Model(err))
    }
}
