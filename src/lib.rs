//! Threadgraph: a tool-calling chat assistant with checkpointed conversation threads.
//!
//! The engine lives in `threadgraph-core`; this crate adds environment
//! configuration and the wiring used by the `threadgraph-chat` binary.

pub mod app;
pub mod command;
pub mod config;

pub use app::{build, build_executor, build_model, build_registry, build_store};
pub use command::Command;
pub use config::{AppConfig, ConfigError, LangSmithConfig, StoreLocation};

pub use threadgraph_core;
pub use threadgraph_core::prelude;
pub use threadgraph_macros::tools;
