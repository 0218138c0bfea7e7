#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use threadgraph_core::completion::{ChatModel, ModelDelta, ModelRequest, ModelStream};
use threadgraph_core::prelude::*;

/// What the scripted model does on its next call.
pub enum Step {
    Reply(Message),
    Fail(ModelError),
    /// Emits the text, then never finishes
    Hang(String),
}

/// Chat model test double that plays back a fixed script.
#[derive(Default)]
pub struct ScriptedModel {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            requests: Mutex::default(),
        })
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next_step(&self, request: ModelRequest) -> Step {
        self.requests.lock().unwrap().push(request);
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::Fail(ModelError::Provider("script exhausted".into())))
    }
}

/// Splits a reply into the fragments a provider would stream.
fn deltas_for(message: &Message) -> Vec<Result<ModelDelta, ModelError>> {
    let mut deltas: Vec<_> = message
        .content
        .split_inclusive(' ')
        .map(|word| Ok(ModelDelta::Content(word.to_string())))
        .collect();
    for (index, call) in message.tool_calls.iter().enumerate() {
        let arguments = call.args.to_string();
        let (head, tail) = arguments.split_at(arguments.len() / 2);
        deltas.push(Ok(ModelDelta::ToolCallChunk {
            index: index as i32,
            id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            arguments: Some(head.to_string()),
        }));
        deltas.push(Ok(ModelDelta::ToolCallChunk {
            index: index as i32,
            id: None,
            name: None,
            arguments: Some(tail.to_string()),
        }));
    }
    deltas
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn invoke(&self, request: ModelRequest) -> Result<Message, ModelError> {
        match self.next_step(request) {
            Step::Reply(message) => Ok(message),
            Step::Fail(e) => Err(e),
            Step::Hang(_) => futures::future::pending().await,
        }
    }

    async fn stream(&self, request: ModelRequest) -> Result<ModelStream, ModelError> {
        match self.next_step(request) {
            Step::Reply(message) => Ok(Box::pin(stream::iter(deltas_for(&message)))),
            Step::Fail(e) => Err(e),
            Step::Hang(text) => Ok(Box::pin(
                stream::iter(vec![Ok(ModelDelta::Content(text))]).chain(stream::pending()),
            )),
        }
    }
}

pub fn answer(text: &str) -> Step {
    Step::Reply(Message::assistant(text))
}

pub fn call_tools(calls: Vec<(&str, &str, Value)>) -> Step {
    Step::Reply(
        Message::assistant("").with_tool_calls(
            calls
                .into_iter()
                .map(|(id, name, args)| ToolCall::new(id, name, args))
                .collect(),
        ),
    )
}

pub fn executor(store: Arc<dyn CheckpointStore>, model: Arc<ScriptedModel>) -> TurnExecutor {
    let registry = Arc::new(ToolRegistry::standard(StandardTools::default()));
    TurnExecutor::new(store, ChatNode::new(model), ToolNode::new(registry))
}

pub fn roles(messages: &[Message]) -> Vec<Role> {
    messages.iter().map(|m| m.role).collect()
}
