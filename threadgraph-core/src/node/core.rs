use super::Context;
use crate::types::{ChatState, NodeResult};
use async_trait::async_trait;
use std::fmt::Debug;

/// One phase of a turn
#[async_trait]
pub trait Node: Send + Sync + Debug {
    /// Process the current state and return the messages this phase adds
    async fn process(&self, ctx: &Context, state: &ChatState) -> NodeResult;

    /// Get the name of this node
    fn name(&self) -> &str;
}
