mod chat;
mod config;
mod context;
mod core;
mod tools;

pub use chat::ChatNode;
pub use config::{NodeConfig, NodeConfigBuilder};
pub use context::Context;
pub use self::core::Node;
pub use tools::ToolNode;
