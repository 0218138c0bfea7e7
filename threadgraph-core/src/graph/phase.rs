use crate::types::{unanswered_tool_calls, Message, Role};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Position of a thread in the turn state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Start,
    ModelInference,
    ToolExecution,
    End,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "START",
            Phase::ModelInference => "MODEL_INFERENCE",
            Phase::ToolExecution => "TOOL_EXECUTION",
            Phase::End => "END",
        }
    }

    /// Where a thread whose history is `messages` stands.
    ///
    /// Unanswered tool calls put it in `TOOL_EXECUTION`, a trailing user or tool
    /// message in `MODEL_INFERENCE`, a trailing final answer at `END`.
    pub fn from_history(messages: &[Message]) -> Phase {
        if !unanswered_tool_calls(messages).is_empty() {
            return Phase::ToolExecution;
        }
        match messages.last().map(|m| m.role) {
            None => Phase::Start,
            Some(Role::User) | Some(Role::Tool) => Phase::ModelInference,
            Some(Role::Assistant) => Phase::End,
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "START" => Ok(Phase::Start),
            "MODEL_INFERENCE" => Ok(Phase::ModelInference),
            "TOOL_EXECUTION" => Ok(Phase::ToolExecution),
            "END" => Ok(Phase::End),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Routing after model inference: tool calls go to `TOOL_EXECUTION`, anything
/// else ends the turn.
pub fn tools_condition(reply: &Message) -> Phase {
    if reply.has_tool_calls() {
        Phase::ToolExecution
    } else {
        Phase::End
    }
}
