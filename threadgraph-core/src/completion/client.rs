use super::tracing::TracingProvider;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
        CreateChatCompletionStreamResponse,
    },
    Client as OpenAIClient,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::warn;
use uuid::Uuid;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type CompletionStream =
    Pin<Box<dyn Stream<Item = Result<CreateChatCompletionStreamResponse, BoxError>> + Send>>;

#[derive(Debug, Clone)]
pub struct ChatCompletionRequestOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub tools: Option<Vec<ChatCompletionTool>>,
    pub tool_choice: Option<ChatCompletionToolChoiceOption>,
}

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_RUN_NAME: &str = "chat_turn_with_tools";

impl Default for ChatCompletionRequestOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE.into(),
            tools: None,
            tool_choice: None,
        }
    }
}

/// Per-call tracing information
#[derive(Debug, Clone, Default)]
pub struct ChatCompletionCallOptions {
    pub trace_id: Option<String>,
    pub parent_trace_id: Option<String>,
    pub run_name: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ChatCompletionCallOptions {
    pub fn new(trace_id: Option<String>, parent_trace_id: Option<String>) -> Self {
        Self {
            trace_id,
            parent_trace_id,
            ..Default::default()
        }
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = Some(run_name.into());
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }
}

fn create_base_request(
    messages: Vec<ChatCompletionRequestMessage>,
    options: ChatCompletionRequestOptions,
) -> CreateChatCompletionRequestArgs {
    let mut builder = CreateChatCompletionRequestArgs::default();
    builder.model(options.model).messages(messages);
    if let Some(temp) = options.temperature {
        builder.temperature(temp);
    }
    if let Some(tools) = options.tools {
        builder.tools(tools);
    }
    if let Some(tool_choice) = options.tool_choice {
        builder.tool_choice(tool_choice);
    }
    builder
}

/// Low-level access to an OpenAI-compatible chat completion endpoint.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn create_chat_completion_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        options: ChatCompletionRequestOptions,
    ) -> Result<CreateChatCompletionRequest, BoxError> {
        Ok(create_base_request(messages, options).stream(false).build()?)
    }

    fn create_chat_completion_stream_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        options: ChatCompletionRequestOptions,
    ) -> Result<CreateChatCompletionRequest, BoxError> {
        Ok(create_base_request(messages, options).stream(true).build()?)
    }

    async fn complete(
        &self,
        request: CreateChatCompletionRequest,
        options: Option<ChatCompletionCallOptions>,
    ) -> Result<CreateChatCompletionResponse, BoxError>;

    async fn complete_stream(
        &self,
        request: CreateChatCompletionRequest,
        options: Option<ChatCompletionCallOptions>,
    ) -> Result<CompletionStream, BoxError>;
}

pub struct ChatClientImpl {
    client: OpenAIClient<OpenAIConfig>,
    tracer: Option<Arc<dyn TracingProvider>>,
}

impl ChatClientImpl {
    pub fn new(api_key: String) -> Self {
        Self::with_config(OpenAIConfig::new().with_api_key(api_key))
    }

    /// Client for any OpenAI-compatible endpoint, e.g. `https://api.groq.com/openai/v1`.
    pub fn with_api_base(api_key: String, api_base: impl Into<String>) -> Self {
        Self::with_config(
            OpenAIConfig::new()
                .with_api_key(api_key)
                .with_api_base(api_base),
        )
    }

    pub fn with_config(config: OpenAIConfig) -> Self {
        Self {
            client: OpenAIClient::with_config(config),
            tracer: None,
        }
    }

    pub fn with_tracer(self, tracer: Arc<dyn TracingProvider>) -> Self {
        Self {
            client: self.client,
            tracer: Some(tracer),
        }
    }

    async fn start_trace(
        &self,
        name: &str,
        trace_type: &str,
        request: &CreateChatCompletionRequest,
        options: &Option<ChatCompletionCallOptions>,
    ) -> String {
        let trace_id = options
            .as_ref()
            .and_then(|o| o.trace_id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Some(tracer) = &self.tracer {
            let parent_trace_id = options.as_ref().and_then(|o| o.parent_trace_id.clone());
            let run_name = options
                .as_ref()
                .and_then(|o| o.run_name.clone())
                .unwrap_or_else(|| name.to_string());
            let metadata = options
                .as_ref()
                .map(|o| o.metadata.clone())
                .unwrap_or_default();
            let inputs = serde_json::to_value(request)
                .unwrap_or_else(|_| json!({ "error": "Failed to serialize request" }));

            if let Err(e) = tracer
                .start_trace(
                    &trace_id,
                    &run_name,
                    trace_type,
                    &inputs,
                    parent_trace_id,
                    Some(SystemTime::now()),
                    &metadata,
                )
                .await
            {
                warn!(error = %e, trace_id = %trace_id, "failed to start trace");
            }
        }
        trace_id
    }
}

async fn end_trace(tracer: &Option<Arc<dyn TracingProvider>>, trace_id: &str, outputs: &Value) {
    if let Some(tracer) = tracer {
        if let Err(e) = tracer
            .end_trace(trace_id, outputs, Some(SystemTime::now()))
            .await
        {
            warn!(error = %e, trace_id = %trace_id, "failed to end trace");
        }
    }
}

#[async_trait]
impl ChatClient for ChatClientImpl {
    async fn complete(
        &self,
        request: CreateChatCompletionRequest,
        options: Option<ChatCompletionCallOptions>,
    ) -> Result<CreateChatCompletionResponse, BoxError> {
        let trace_id = self
            .start_trace("chat_completion", "llm", &request, &options)
            .await;

        let response = self.client.chat().create(request).await?;

        let outputs = serde_json::to_value(&response)
            .unwrap_or_else(|_| json!({ "error": "Failed to serialize response" }));
        end_trace(&self.tracer, &trace_id, &outputs).await;

        Ok(response)
    }

    async fn complete_stream(
        &self,
        request: CreateChatCompletionRequest,
        options: Option<ChatCompletionCallOptions>,
    ) -> Result<CompletionStream, BoxError> {
        let trace_id = self
            .start_trace("chat_completion_stream", "llm", &request, &options)
            .await;

        let mut stream = self.client.chat().create_stream(request).await?;
        let tracer = self.tracer.clone();

        let stream = async_stream::stream! {
            let mut full_response = String::new();
            while let Some(result) = stream.next().await {
                match result {
                    Ok(response) => {
                        if let Some(choice) = response.choices.first() {
                            if let Some(content) = &choice.delta.content {
                                full_response.push_str(content);
                            }
                        }
                        yield Ok(response);
                    }
                    Err(e) => {
                        yield Err(Box::new(e) as BoxError);
                    }
                }
            }

            end_trace(&tracer, &trace_id, &json!({ "streamed_content": full_response })).await;
        };

        Ok(Box::pin(stream))
    }
}
