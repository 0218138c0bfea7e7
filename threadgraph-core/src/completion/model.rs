use super::client::{ChatClient, ChatCompletionCallOptions, ChatCompletionRequestOptions};
use crate::tool::ToolSchema;
use crate::types::{Message, ModelError, Role, ToolCall};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestAssistantMessageContent, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestSystemMessageContent,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestToolMessageContent,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
    ChatCompletionResponseMessage, ChatCompletionTool, ChatCompletionToolChoiceOption,
    ChatCompletionToolType, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

/// Everything a model needs for one inference.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    /// Empty when tools are disabled
    pub tools: Vec<ToolSchema>,
    /// Prepended to the model input, never stored in the thread
    pub system_prompt: Option<String>,
    pub call_options: ChatCompletionCallOptions,
}

/// A fragment of a streamed model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelDelta {
    Content(String),
    /// Part of the `index`-th tool call; id and name usually arrive first,
    /// the arguments in pieces.
    ToolCallChunk {
        index: i32,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
}

pub type ModelStream = Pin<Box<dyn Stream<Item = Result<ModelDelta, ModelError>> + Send>>;

/// The completion provider as the turn executor sees it.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete reply in one round trip.
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError>;

    /// Reply as a stream of fragments; fold them with [`MessageAccumulator`].
    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError>;
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Assembles streamed [`ModelDelta`]s into one assistant message.
#[derive(Debug, Default)]
pub struct MessageAccumulator {
    content: String,
    tool_calls: BTreeMap<i32, PartialToolCall>,
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &ModelDelta) {
        match delta {
            ModelDelta::Content(text) => self.content.push_str(text),
            ModelDelta::ToolCallChunk {
                index,
                id,
                name,
                arguments,
            } => {
                let call = self.tool_calls.entry(*index).or_default();
                if let Some(id) = id.as_ref().filter(|id| !id.is_empty()) {
                    call.id = Some(id.clone());
                }
                if let Some(name) = name {
                    call.name.push_str(name);
                }
                if let Some(arguments) = arguments {
                    call.arguments.push_str(arguments);
                }
            }
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn finish(self) -> Result<Message, ModelError> {
        let tool_calls = self
            .tool_calls
            .into_values()
            .map(|call| {
                if call.name.is_empty() {
                    return Err(ModelError::MalformedResponse(
                        "streamed tool call without a name".into(),
                    ));
                }
                Ok(ToolCall {
                    id: call.id.unwrap_or_else(ToolCall::generate_id),
                    name: call.name,
                    args: parse_arguments(&call.arguments),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Message::assistant(self.content).with_tool_calls(tool_calls))
    }
}

/// Tool arguments arrive as a JSON string; unparseable text is kept verbatim
/// so the tool reports it as invalid arguments.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub fn to_openai_tool(schema: &ToolSchema) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: schema.name.clone(),
            description: Some(schema.description.clone()),
            parameters: Some(schema.parameters.clone()),
            strict: None,
        },
    }
}

/// Converts thread messages (plus an optional system prompt) into request messages.
pub fn to_openai_messages(
    system_prompt: Option<&str>,
    messages: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>, ModelError> {
    let mut converted = Vec::with_capacity(messages.len() + 1);
    if let Some(prompt) = system_prompt {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(ChatCompletionRequestSystemMessageContent::Text(
                prompt.to_string(),
            ))
            .build()?;
        converted.push(ChatCompletionRequestMessage::System(system));
    }

    for message in messages {
        let request_message = match message.role {
            Role::User => ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Text(
                        message.content.clone(),
                    ))
                    .build()?,
            ),
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !message.content.is_empty() {
                    args.content(ChatCompletionRequestAssistantMessageContent::Text(
                        message.content.clone(),
                    ));
                }
                if message.has_tool_calls() {
                    args.tool_calls(
                        message
                            .tool_calls
                            .iter()
                            .map(|call| ChatCompletionMessageToolCall {
                                id: call.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: call.name.clone(),
                                    arguments: call.args.to_string(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                }
                ChatCompletionRequestMessage::Assistant(args.build()?)
            }
            Role::Tool => {
                let tool_call_id = message.tool_call_id.clone().ok_or_else(|| {
                    ModelError::MalformedResponse(format!(
                        "tool message {} has no tool_call_id",
                        message.id
                    ))
                })?;
                ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .content(ChatCompletionRequestToolMessageContent::Text(
                            message.content.clone(),
                        ))
                        .tool_call_id(tool_call_id)
                        .build()?,
                )
            }
        };
        converted.push(request_message);
    }
    Ok(converted)
}

/// Converts a (non-streamed) response message into a thread message.
pub fn from_openai_message(message: ChatCompletionResponseMessage) -> Message {
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            args: parse_arguments(&call.function.arguments),
            name: call.function.name,
        })
        .collect();
    Message::assistant(message.content.unwrap_or_default())
        .with_tool_calls(tool_calls)
        .with_call_ids_filled()
}

/// [`ChatModel`] backed by an OpenAI-compatible [`ChatClient`].
pub struct OpenAiChatModel {
    client: Arc<dyn ChatClient>,
    options: ChatCompletionRequestOptions,
}

impl OpenAiChatModel {
    pub fn new(client: Arc<dyn ChatClient>, options: ChatCompletionRequestOptions) -> Self {
        Self { client, options }
    }

    fn request_parts(
        &self,
        request: &ModelRequest,
    ) -> Result<(Vec<ChatCompletionRequestMessage>, ChatCompletionRequestOptions), ModelError> {
        let messages = to_openai_messages(request.system_prompt.as_deref(), &request.messages)?;
        let mut options = self.options.clone();
        if !request.tools.is_empty() {
            options.tools = Some(request.tools.iter().map(to_openai_tool).collect());
            options.tool_choice = Some(ChatCompletionToolChoiceOption::Auto);
        }
        Ok((messages, options))
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError> {
        let (messages, options) = self.request_parts(&request)?;
        let completion_request = self
            .client
            .create_chat_completion_request(messages, options)
            .map_err(|e| ModelError::Provider(e.to_string()))?;
        let response = self
            .client
            .complete(completion_request, Some(request.call_options))
            .await
            .map_err(|e| ModelError::Provider(e.to_string()))?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ModelError::MalformedResponse("completion returned no choices".into())
        })?;
        Ok(from_openai_message(choice.message))
    }

    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        let (messages, options) = self.request_parts(&request)?;
        let completion_request = self
            .client
            .create_chat_completion_stream_request(messages, options)
            .map_err(|e| ModelError::Provider(e.to_string()))?;
        let mut upstream = self
            .client
            .complete_stream(completion_request, Some(request.call_options))
            .await
            .map_err(|e| ModelError::Provider(e.to_string()))?;

        let stream = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        for choice in chunk.choices {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(ModelDelta::Content(content));
                                }
                            }
                            for call in choice.delta.tool_calls.unwrap_or_default() {
                                let (name, arguments) = match call.function {
                                    Some(function) => (function.name, function.arguments),
                                    None => (None, None),
                                };
                                yield Ok(ModelDelta::ToolCallChunk {
                                    index: call.index,
                                    id: call.id,
                                    name,
                                    arguments,
                                });
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(ModelError::Provider(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
