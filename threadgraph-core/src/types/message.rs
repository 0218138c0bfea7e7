use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a tool invocation, carried on tool messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// Fresh local id for a call the provider left unnamed
    pub fn generate_id() -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }
}

/// One utterance in a conversation thread. Immutable once checkpointed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ToolStatus>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            status: None,
            created_at: Utc::now(),
        }
    }

    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into())
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content.into())
    }

    /// Creates a tool result message answering `tool_call_id`
    pub fn tool(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        status: ToolStatus,
    ) -> Self {
        let mut message = Self::new(Role::Tool, content.into());
        message.tool_call_id = Some(tool_call_id.into());
        message.status = Some(status);
        message
    }

    /// Adds tool calls to the message
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Gives every tool call with an empty id a generated one.
    pub fn with_call_ids_filled(mut self) -> Self {
        for call in self.tool_calls.iter_mut().filter(|call| call.id.is_empty()) {
            call.id = ToolCall::generate_id();
        }
        self
    }

    /// Overrides the generated id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && self.tool_calls.is_empty()
    }
}

/// Tool calls in `history` that no tool message has answered yet, in request order.
pub fn unanswered_tool_calls(history: &[Message]) -> Vec<&ToolCall> {
    let mut pending: Vec<&ToolCall> = Vec::new();
    for message in history {
        match message.role {
            Role::Assistant => pending.extend(message.tool_calls.iter()),
            Role::Tool => {
                if let Some(id) = &message.tool_call_id {
                    pending.retain(|call| &call.id != id);
                }
            }
            Role::User => {}
        }
    }
    pending
}

/// Checks that appending `new` after `existing` keeps every tool result paired
/// with exactly one open tool call. Returns the reason on violation.
pub fn validate_append(existing: &[Message], new: &[Message]) -> Result<(), String> {
    let mut open: Vec<String> = unanswered_tool_calls(existing)
        .into_iter()
        .map(|call| call.id.clone())
        .collect();

    for message in new {
        match message.role {
            Role::User => {
                if message.tool_call_id.is_some() || message.has_tool_calls() {
                    return Err(format!(
                        "user message {} carries tool call fields",
                        message.id
                    ));
                }
            }
            Role::Assistant => {
                if message.tool_call_id.is_some() {
                    return Err(format!(
                        "assistant message {} carries a tool_call_id",
                        message.id
                    ));
                }
                for call in &message.tool_calls {
                    // Ids may be reused once answered, never while still open
                    if call.id.is_empty() || open.contains(&call.id) {
                        return Err(format!("tool call id {:?} is already open", call.id));
                    }
                    open.push(call.id.clone());
                }
            }
            Role::Tool => {
                if message.has_tool_calls() {
                    return Err(format!("tool message {} carries tool calls", message.id));
                }
                let Some(id) = &message.tool_call_id else {
                    return Err(format!("tool message {} has no tool_call_id", message.id));
                };
                match open.iter().position(|open_id| open_id == id) {
                    Some(pos) => {
                        open.remove(pos);
                    }
                    None => {
                        return Err(format!(
                            "tool message {} answers no open tool call (tool_call_id {})",
                            message.id, id
                        ))
                    }
                }
            }
        }
    }
    Ok(())
}
