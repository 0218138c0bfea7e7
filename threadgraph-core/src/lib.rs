//! Threadgraph is a conversational assistant core: a chat model driven through an
//! explicit turn state machine, with tool calling and checkpointed threads.

#![allow(unused_extern_crates)]
extern crate self as threadgraph_core;

pub mod checkpoint;
pub mod completion;
pub mod graph;
pub mod node;
pub mod session;
pub mod tool;
pub mod types;

#[doc(hidden)]
pub use async_trait;

pub mod prelude {
    //! Convenient re-exports of commonly used types
    pub use crate::checkpoint::{
        Checkpoint, CheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore, ThreadState,
    };
    pub use crate::completion::{
        ChatClient, ChatClientImpl, ChatCompletionCallOptions, ChatCompletionRequestOptions,
        ChatModel, LangSmithTracer, ModelDelta, ModelRequest, OpenAiChatModel, TracingError,
        TracingProvider,
    };
    pub use crate::graph::{
        ExecutorConfig, Phase, ThreadDirectory, TurnEvent, TurnExecutor, TurnStream,
    };
    pub use crate::node::{ChatNode, Context, Node, NodeConfig, NodeConfigBuilder, ToolNode};
    pub use crate::session::{ChatSession, DisplayMessage};
    pub use crate::tool::{
        JsonSchema, StandardTools, StandardToolsConfig, ToolFunction, ToolRegistry, ToolSchema,
    };
    pub use crate::types::{
        ChatState, Message, ModelError, NodeError, NodeResult, Role, StoreError, StoreResult,
        ToolCall, ToolError, ToolStatus, TurnError, TurnResult, UpdateableState,
    };
}

// Re-export main types
pub use prelude::*;
