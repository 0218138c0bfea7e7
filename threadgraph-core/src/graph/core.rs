use super::{tools_condition, Phase, TurnEvent, TurnStream};
use crate::checkpoint::CheckpointStore;
use crate::node::{ChatNode, Context, Node, ToolNode};
use crate::types::{ChatState, Message, NodeError, TurnError, TurnResult, UpdateableState};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Sender};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

pub const DEFAULT_RECURSION_LIMIT: usize = 25;
const EVENT_BUFFER: usize = 64;

/// Limits applied to every turn
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Maximum model inferences in one turn
    pub recursion_limit: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

/// Runs conversation turns:
/// `START -> MODEL_INFERENCE <-> TOOL_EXECUTION -> END`.
///
/// Every message a phase produces is checkpointed before the next phase
/// starts, so an interrupted turn can be picked up with [`TurnExecutor::resume`].
#[derive(Debug, Clone)]
pub struct TurnExecutor {
    store: Arc<dyn CheckpointStore>,
    chat: Arc<ChatNode>,
    tools: Arc<ToolNode>,
    config: ExecutorConfig,
}

impl TurnExecutor {
    /// The chat node is bound to the schemas of the tool node's registry;
    /// an empty registry disables tools.
    pub fn new(store: Arc<dyn CheckpointStore>, chat: ChatNode, tools: ToolNode) -> Self {
        let schemas = tools.registry().schemas();
        Self {
            store,
            chat: Arc::new(chat.with_tools(schemas)),
            tools: Arc::new(tools),
            config: ExecutorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    /// Run a turn to completion and return the thread's updated state.
    pub async fn invoke(&self, ctx: &Context, text: impl Into<String>) -> TurnResult<ChatState> {
        self.run(ctx, Some(Message::user(text)), None).await
    }

    /// Run a turn in the background, reporting progress as it happens.
    pub fn stream(&self, ctx: Context, text: impl Into<String>) -> TurnStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let executor = self.clone();
        let user = Message::user(text);
        let handle = tokio::spawn(async move { executor.run(&ctx, Some(user), Some(&tx)).await });
        TurnStream::new(ReceiverStream::new(rx), handle)
    }

    /// Finish a turn that was interrupted. A thread that already ended is
    /// returned unchanged.
    pub async fn resume(&self, ctx: &Context) -> TurnResult<ChatState> {
        self.run(ctx, None, None).await
    }

    async fn run(
        &self,
        ctx: &Context,
        input: Option<Message>,
        events: Option<&Sender<TurnEvent>>,
    ) -> TurnResult<ChatState> {
        let history = self.store.read(&ctx.thread_id).await?;
        let mut state = ChatState::new(ctx.thread_id.clone(), history);
        info!(thread_id = %ctx.thread_id, trace_id = %ctx.trace_id, history = state.messages.len(), "turn started");

        // Leftover calls must be answered before anything else lands in the thread
        if !state.pending_tool_calls().is_empty() {
            info!(thread_id = %ctx.thread_id, "completing interrupted tool calls");
            let added = self.tools.process(ctx, &state).await?;
            self.commit(ctx, &mut state, added, events).await?;
        }
        if let Some(user) = input {
            self.commit(ctx, &mut state, vec![user], events).await?;
        }

        let mut inferences = 0;
        let mut phase = Phase::from_history(&state.messages);
        loop {
            debug!(thread_id = %ctx.thread_id, phase = %phase, "entering phase");
            phase = match phase {
                Phase::Start | Phase::End => break,
                Phase::ModelInference => {
                    if inferences == self.config.recursion_limit {
                        return Err(TurnError::RecursionLimit(self.config.recursion_limit));
                    }
                    inferences += 1;
                    let added = match events {
                        Some(tx) => self.chat.process_streaming(ctx, &state, tx).await?,
                        None => self.chat.process(ctx, &state).await?,
                    };
                    let reply = added.last().ok_or_else(|| {
                        NodeError::Execution("model inference produced no message".into())
                    })?;
                    let next = tools_condition(reply);
                    self.commit(ctx, &mut state, added, events).await?;
                    next
                }
                Phase::ToolExecution => {
                    let added = self.tools.process(ctx, &state).await?;
                    self.commit(ctx, &mut state, added, events).await?;
                    Phase::ModelInference
                }
            };
        }

        info!(thread_id = %ctx.thread_id, inferences, "turn finished");
        Ok(state)
    }

    async fn commit(
        &self,
        ctx: &Context,
        state: &mut ChatState,
        messages: Vec<Message>,
        events: Option<&Sender<TurnEvent>>,
    ) -> TurnResult<()> {
        self.store.append(&ctx.thread_id, &messages).await?;
        if let Some(tx) = events {
            for message in &messages {
                // A closed receiver means the turn is being torn down
                let _ = tx.send(TurnEvent::Message(message.clone())).await;
            }
        }
        state.update_many(messages);
        Ok(())
    }
}
