use crate::completion::{ChatCompletionCallOptions, DEFAULT_RUN_NAME};
use std::collections::HashMap;

/// Context for one turn on one thread
#[derive(Debug, Clone)]
pub struct Context {
    /// Thread the turn reads from and appends to
    pub thread_id: String,
    /// Unique identifier for log correlation
    pub trace_id: String,
    /// Parent run for the completion traces, if any
    pub parent_trace_id: Option<String>,
    /// Name the completion runs are traced under
    pub run_name: String,
    /// Additional metadata, attached to every trace
    pub metadata: HashMap<String, String>,
}

impl Context {
    pub fn new(thread_id: impl Into<String>, trace_id: impl Into<String>) -> Self {
        let thread_id = thread_id.into();
        let metadata = HashMap::from([("thread_id".to_string(), thread_id.clone())]);
        Self {
            thread_id,
            trace_id: trace_id.into(),
            parent_trace_id: None,
            run_name: DEFAULT_RUN_NAME.to_string(),
            metadata,
        }
    }

    /// Context with a fresh trace id.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self::new(thread_id, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_parent_trace_id(mut self, parent_trace_id: impl Into<String>) -> Self {
        self.parent_trace_id = Some(parent_trace_id.into());
        self
    }

    pub fn with_run_name(mut self, run_name: impl Into<String>) -> Self {
        self.run_name = run_name.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Trace options for one completion call made within this turn.
    pub fn call_options(&self) -> ChatCompletionCallOptions {
        ChatCompletionCallOptions::new(None, self.parent_trace_id.clone())
            .with_run_name(self.run_name.clone())
            .with_metadata(self.metadata.clone())
    }
}
