//! Application settings read from the environment.

use std::path::PathBuf;
use thiserror::Error;
use threadgraph_core::completion::DEFAULT_MODEL;
use threadgraph_core::graph::DEFAULT_RECURSION_LIMIT;
use threadgraph_core::node::NodeConfig;
use threadgraph_core::tool::StandardToolsConfig;

pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "openai/gpt-oss-20b";
pub const DEFAULT_LANGSMITH_PROJECT: &str = "chatbot-project";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("no API key: set OPENAI_API_KEY or GROQ_API_KEY")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where checkpoints are kept.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    Memory,
    Sqlite(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LangSmithConfig {
    pub api_key: String,
    pub project: String,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: String,
    /// OpenAI-compatible endpoint; `None` means the OpenAI default
    pub api_base: Option<String>,
    pub model: String,
    pub store: StoreLocation,
    pub tools_enabled: bool,
    pub system_prompt: Option<String>,
    pub node: NodeConfig,
    pub recursion_limit: usize,
    pub tools: StandardToolsConfig,
    /// Set when `LANGSMITH_API_KEY` is present
    pub langsmith: Option<LangSmithConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let (api_key, api_base, default_model) = match (get("OPENAI_API_KEY"), get("GROQ_API_KEY")) {
            (Some(key), _) => (key, None, DEFAULT_MODEL),
            (None, Some(key)) => (key, Some(GROQ_API_BASE.to_string()), GROQ_DEFAULT_MODEL),
            (None, None) => return Err(ConfigError::MissingApiKey),
        };

        let mut node = NodeConfig::default();
        if let Some(value) = get("THREADGRAPH_TIMEOUT_SECS") {
            node.timeout = parse_number("THREADGRAPH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = get("THREADGRAPH_MAX_RETRIES") {
            node.max_retries = parse_number("THREADGRAPH_MAX_RETRIES", &value)?;
        }
        let recursion_limit = match get("THREADGRAPH_RECURSION_LIMIT") {
            Some(value) => parse_number("THREADGRAPH_RECURSION_LIMIT", &value)?,
            None => DEFAULT_RECURSION_LIMIT,
        };

        let tools_enabled = match get("THREADGRAPH_TOOLS") {
            Some(value) => parse_switch("THREADGRAPH_TOOLS", &value)?,
            None => true,
        };

        let mut tools = StandardToolsConfig::default();
        if let Some(url) = get("THREADGRAPH_SEARCH_URL") {
            tools.search_url = url;
        }
        if let Some(url) = get("THREADGRAPH_STOCK_API_URL") {
            tools.stock_api_url = url;
        }

        let langsmith = get("LANGSMITH_API_KEY").map(|api_key| LangSmithConfig {
            api_key,
            project: get("LANGSMITH_PROJECT")
                .unwrap_or_else(|| DEFAULT_LANGSMITH_PROJECT.to_string()),
            endpoint: get("LANGSMITH_ENDPOINT"),
        });

        Ok(Self {
            api_key,
            api_base: get("THREADGRAPH_API_BASE").or(api_base),
            model: get("THREADGRAPH_MODEL").unwrap_or_else(|| default_model.to_string()),
            store: get("THREADGRAPH_DB")
                .map(|path| StoreLocation::Sqlite(PathBuf::from(path)))
                .unwrap_or(StoreLocation::Memory),
            tools_enabled,
            system_prompt: get("THREADGRAPH_SYSTEM_PROMPT"),
            node,
            recursion_limit,
            tools,
            langsmith,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

fn parse_switch(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
