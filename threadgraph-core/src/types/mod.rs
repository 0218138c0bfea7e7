mod error;
mod message;
mod result;
mod state;

pub use error::{ModelError, NodeError, StoreError, ToolError, TurnError};
pub use message::{unanswered_tool_calls, validate_append, Message, Role, ToolCall, ToolStatus};
pub use result::{NodeResult, StoreResult, TurnResult};
pub use state::{ChatState, UpdateableState};
