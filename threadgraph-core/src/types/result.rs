use super::error::{NodeError, StoreError, TurnError};
use super::message::Message;

/// Messages emitted by one node run, appended to the thread in order.
pub type NodeResult = Result<Vec<Message>, NodeError>;

pub type StoreResult<T> = Result<T, StoreError>;

pub type TurnResult<T> = Result<T, TurnError>;
