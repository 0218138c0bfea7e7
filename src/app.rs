//! Wiring of the core pieces from an [`AppConfig`].

use crate::config::{AppConfig, StoreLocation};
use std::sync::Arc;
use threadgraph_core::prelude::*;
use tracing::info;

/// Opens the configured checkpoint store.
pub async fn build_store(config: &AppConfig) -> StoreResult<Arc<dyn CheckpointStore>> {
    match &config.store {
        StoreLocation::Memory => {
            info!("using in-memory checkpoints");
            Ok(Arc::new(MemoryCheckpointStore::new()))
        }
        StoreLocation::Sqlite(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            info!(path = %path.display(), "using sqlite checkpoints");
            Ok(Arc::new(SqliteCheckpointStore::open(path).await?))
        }
    }
}

/// OpenAI-compatible chat model, traced to LangSmith when configured.
pub fn build_model(config: &AppConfig) -> Arc<dyn ChatModel> {
    let mut client = match &config.api_base {
        Some(base) => ChatClientImpl::with_api_base(config.api_key.clone(), base.clone()),
        None => ChatClientImpl::new(config.api_key.clone()),
    };
    if let Some(langsmith) = &config.langsmith {
        let mut tracer =
            LangSmithTracer::new(langsmith.api_key.clone()).with_project(langsmith.project.clone());
        if let Some(endpoint) = &langsmith.endpoint {
            tracer = tracer.with_base_url(endpoint.clone());
        }
        info!(project = %langsmith.project, "tracing completions to LangSmith");
        client = client.with_tracer(Arc::new(tracer));
    }

    let options = ChatCompletionRequestOptions {
        model: config.model.clone(),
        ..Default::default()
    };
    Arc::new(OpenAiChatModel::new(Arc::new(client), options))
}

/// Standard tools, or none when tools are switched off.
pub fn build_registry(config: &AppConfig) -> ToolRegistry {
    if config.tools_enabled {
        ToolRegistry::standard(StandardTools::new(config.tools.clone()))
    } else {
        ToolRegistry::new()
    }
}

pub fn build_executor(
    config: &AppConfig,
    store: Arc<dyn CheckpointStore>,
    model: Arc<dyn ChatModel>,
) -> TurnExecutor {
    let mut chat = ChatNode::new(model).with_config(config.node.clone());
    if let Some(prompt) = &config.system_prompt {
        chat = chat.with_system_prompt(prompt.clone());
    }
    let tools = ToolNode::new(Arc::new(build_registry(config)));
    TurnExecutor::new(store, chat, tools).with_config(ExecutorConfig {
        recursion_limit: config.recursion_limit,
    })
}

/// Store, model and executor, ready for a [`ChatSession`].
pub async fn build(config: &AppConfig) -> StoreResult<TurnExecutor> {
    let store = build_store(config).await?;
    Ok(build_executor(config, store, build_model(config)))
}
