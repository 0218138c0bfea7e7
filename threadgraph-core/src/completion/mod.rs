mod client;
mod model;
mod tracing;

pub use client::{
    BoxError, ChatClient, ChatClientImpl, ChatCompletionCallOptions, ChatCompletionRequestOptions,
    CompletionStream, DEFAULT_MODEL, DEFAULT_RUN_NAME,
};
pub use model::{
    from_openai_message, to_openai_messages, to_openai_tool, ChatModel, MessageAccumulator,
    ModelDelta, ModelRequest, ModelStream, OpenAiChatModel,
};
pub use self::tracing::{LangSmithTracer, TracingError, TracingProvider, DEFAULT_LANGSMITH_ENDPOINT};
