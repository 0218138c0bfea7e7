use super::message::{unanswered_tool_calls, Message, ToolCall};

pub trait UpdateableState {
    type Update;

    /// Update this state with a single update.
    fn update(&mut self, update: Self::Update);

    /// Apply multiple updates in sequence.
    fn update_many<I: IntoIterator<Item = Self::Update>>(&mut self, updates: I) {
        for update in updates {
            self.update(update);
        }
    }
}

/// Working state of one thread during a turn: its id and the ordered history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

impl ChatState {
    pub fn new(thread_id: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn pending_tool_calls(&self) -> Vec<&ToolCall> {
        unanswered_tool_calls(&self.messages)
    }

    /// Content of the last assistant answer, if the thread ends in one.
    pub fn final_answer(&self) -> Option<&str> {
        self.last_message()
            .filter(|m| m.is_final_answer())
            .map(|m| m.content.as_str())
    }
}

/// Messages are appended; a message whose id is already present is ignored.
impl UpdateableState for ChatState {
    type Update = Message;

    fn update(&mut self, update: Message) {
        if !self.messages.iter().any(|m| m.id == update.id) {
            self.messages.push(update);
        }
    }
}
