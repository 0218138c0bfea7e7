use super::{Context, Node, NodeConfig};
use crate::completion::{ChatModel, MessageAccumulator, ModelDelta, ModelRequest};
use crate::graph::TurnEvent;
use crate::tool::ToolSchema;
use crate::types::{ChatState, Message, ModelError, NodeError, NodeResult, Role};
use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Model inference phase: asks the model for the next assistant message.
pub struct ChatNode {
    name: String,
    model: Arc<dyn ChatModel>,
    tools: Vec<ToolSchema>,
    system_prompt: Option<String>,
    config: NodeConfig,
}

impl fmt::Debug for ChatNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatNode")
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| &t.name).collect::<Vec<_>>())
            .field("system_prompt", &self.system_prompt)
            .field("config", &self.config)
            .finish()
    }
}

impl ChatNode {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            name: "chat_node".to_string(),
            model,
            tools: Vec::new(),
            system_prompt: None,
            config: NodeConfig::default(),
        }
    }

    /// Schemas advertised to the model on every inference.
    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn request(&self, ctx: &Context, state: &ChatState) -> ModelRequest {
        ModelRequest {
            messages: state.messages.clone(),
            tools: self.tools.clone(),
            system_prompt: self.system_prompt.clone(),
            call_options: ctx.call_options(),
        }
    }

    fn limit(&self) -> Duration {
        Duration::from_secs(self.config.timeout)
    }

    async fn invoke_once(&self, request: ModelRequest) -> Result<Message, ModelError> {
        match timeout(self.limit(), self.model.invoke(request)).await {
            Ok(result) => result.map(Message::with_call_ids_filled),
            Err(_) => Err(ModelError::Timeout(self.config.timeout)),
        }
    }

    /// Same as [`Node::process`], forwarding assistant text to `events` as it arrives.
    pub async fn process_streaming(
        &self,
        ctx: &Context,
        state: &ChatState,
        events: &Sender<TurnEvent>,
    ) -> NodeResult {
        let request = self.request(ctx, state);
        let mut stream = match timeout(self.limit(), self.model.stream(request)).await {
            Ok(stream) => stream?,
            Err(_) => return Err(ModelError::Timeout(self.config.timeout).into()),
        };

        let mut accumulator = MessageAccumulator::new();
        while let Some(delta) = stream.next().await {
            let delta = delta?;
            if let ModelDelta::Content(text) = &delta {
                // A closed receiver means the turn is being torn down
                let _ = events
                    .send(TurnEvent::Delta {
                        role: Role::Assistant,
                        content: text.clone(),
                    })
                    .await;
            }
            accumulator.push(&delta);
        }

        let message = accumulator.finish()?;
        debug!(
            thread_id = %ctx.thread_id,
            tool_calls = message.tool_calls.len(),
            "streamed inference finished"
        );
        Ok(vec![message])
    }
}

#[async_trait]
impl Node for ChatNode {
    async fn process(&self, ctx: &Context, state: &ChatState) -> NodeResult {
        let attempts = self.config.max_retries.max(1);
        let mut attempt = 1;
        loop {
            match self.invoke_once(self.request(ctx, state)).await {
                Ok(message) => {
                    debug!(
                        thread_id = %ctx.thread_id,
                        attempt,
                        tool_calls = message.tool_calls.len(),
                        "inference finished"
                    );
                    return Ok(vec![message]);
                }
                Err(e @ ModelError::MalformedResponse(_)) => return Err(NodeError::Model(e)),
                Err(e) if attempt < attempts => {
                    warn!(thread_id = %ctx.thread_id, attempt, error = %e, "inference failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(NodeError::Model(e)),
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
