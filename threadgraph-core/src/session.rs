//! Presentation-side context: which thread is open and which threads exist.

use crate::graph::{ThreadDirectory, TurnExecutor, TurnStream};
use crate::node::Context;
use crate::types::{Message, Role, StoreResult, TurnResult};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A message as a chat UI shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMessage {
    pub role: Role,
    pub content: String,
}

impl DisplayMessage {
    /// User messages and assistant text; tool traffic is hidden.
    pub fn from_history(messages: &[Message]) -> Vec<DisplayMessage> {
        messages
            .iter()
            .filter(|m| match m.role {
                Role::User => true,
                Role::Assistant => !m.content.is_empty(),
                Role::Tool => false,
            })
            .map(|m| DisplayMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }
}

pub fn generate_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// One user's view of the assistant: the current thread plus every known thread.
#[derive(Debug, Clone)]
pub struct ChatSession {
    executor: TurnExecutor,
    directory: ThreadDirectory,
    thread_id: String,
    threads: Vec<String>,
}

impl ChatSession {
    /// Loads the known threads from the store and opens a fresh one.
    pub async fn open(executor: TurnExecutor) -> StoreResult<Self> {
        let directory = ThreadDirectory::new(executor.store().clone());
        let threads = directory.list().await?;
        let mut session = Self {
            executor,
            directory,
            thread_id: String::new(),
            threads,
        };
        session.new_chat();
        Ok(session)
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Known thread ids, oldest first.
    pub fn threads(&self) -> &[String] {
        &self.threads
    }

    /// Start an empty conversation and make it current.
    pub fn new_chat(&mut self) -> &str {
        self.thread_id = generate_thread_id();
        self.remember(self.thread_id.clone());
        debug!(thread_id = %self.thread_id, "new chat");
        &self.thread_id
    }

    /// Make `thread_id` current and return its history for display.
    pub async fn switch_to(&mut self, thread_id: &str) -> StoreResult<Vec<DisplayMessage>> {
        let history = self.directory.load(thread_id).await?;
        self.thread_id = thread_id.to_string();
        self.remember(thread_id.to_string());
        Ok(DisplayMessage::from_history(&history))
    }

    /// Current thread's history for display.
    pub async fn conversation(&self) -> StoreResult<Vec<DisplayMessage>> {
        let history = self.directory.load(&self.thread_id).await?;
        Ok(DisplayMessage::from_history(&history))
    }

    /// Re-scan the store for threads written by other sessions.
    pub async fn refresh(&mut self) -> StoreResult<&[String]> {
        for thread_id in self.directory.list().await? {
            self.remember(thread_id);
        }
        Ok(&self.threads)
    }

    /// Run a turn on the current thread and return the assistant's answer.
    pub async fn send(&self, text: &str) -> TurnResult<String> {
        let state = self.executor.invoke(&self.context(), text).await?;
        Ok(state.final_answer().unwrap_or_default().to_string())
    }

    pub fn send_streaming(&self, text: &str) -> TurnStream {
        self.executor.stream(self.context(), text)
    }

    fn context(&self) -> Context {
        Context::for_thread(self.thread_id.clone())
    }

    fn remember(&mut self, thread_id: String) {
        if !self.threads.contains(&thread_id) {
            self.threads.push(thread_id);
        }
    }
}
