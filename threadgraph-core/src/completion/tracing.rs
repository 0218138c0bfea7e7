use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::SystemTime;

pub const DEFAULT_LANGSMITH_ENDPOINT: &str = "https://api.smith.langchain.com";

#[derive(Debug)]
pub enum TracingError {
    HttpError(String),
    Other(String),
}

impl std::fmt::Display for TracingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TracingError::HttpError(msg) => write!(f, "Tracing HttpError: {}", msg),
            TracingError::Other(msg) => write!(f, "Tracing Other: {}", msg),
        }
    }
}

impl std::error::Error for TracingError {}

/// Receives one run per completion call.
#[async_trait]
pub trait TracingProvider: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn start_trace(
        &self,
        trace_id: &str,
        name: &str,
        trace_type: &str,
        inputs: &Value,
        parent_trace_id: Option<String>,
        start_time: Option<SystemTime>,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TracingError>;

    async fn end_trace(
        &self,
        trace_id: &str,
        outputs: &Value,
        end_time: Option<SystemTime>,
    ) -> Result<(), TracingError>;
}

/// Posts runs to the LangSmith API.
pub struct LangSmithTracer {
    pub base_url: String,
    pub api_key: String,
    /// LangSmith project the runs are filed under
    pub project: Option<String>,
    pub http_client: Client,
}

impl LangSmithTracer {
    pub fn new(api_key: String) -> Self {
        Self {
            base_url: DEFAULT_LANGSMITH_ENDPOINT.to_string(),
            api_key,
            project: None,
            http_client: Client::new(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Serialize)]
struct RunExtra<'a> {
    metadata: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct StartRunBody<'a> {
    id: &'a str,
    name: &'a str,
    #[serde(rename = "run_type")]
    trace_type: &'a str,
    inputs: &'a Value,
    start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_name: Option<&'a str>,
    extra: RunExtra<'a>,
}

#[derive(Serialize)]
struct EndRunBody<'a> {
    outputs: &'a Value,
    end_time: String,
}

fn format_time(time: Option<SystemTime>) -> String {
    DateTime::<Utc>::from(time.unwrap_or_else(SystemTime::now))
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

async fn check_response(resp: reqwest::Response, action: &str) -> Result<(), TracingError> {
    if resp.status().is_success() {
        return Ok(());
    }
    let status = resp.status();
    let text = resp
        .text()
        .await
        .unwrap_or_else(|_| "No response body".to_string());
    Err(TracingError::HttpError(format!(
        "{} failed: HTTP {} - {}",
        action, status, text
    )))
}

#[async_trait]
impl TracingProvider for LangSmithTracer {
    async fn start_trace(
        &self,
        trace_id: &str,
        name: &str,
        trace_type: &str,
        inputs: &Value,
        parent_trace_id: Option<String>,
        start_time: Option<SystemTime>,
        metadata: &HashMap<String, String>,
    ) -> Result<(), TracingError> {
        let body = StartRunBody {
            id: trace_id,
            name,
            trace_type,
            inputs,
            start_time: format_time(start_time),
            parent_run_id: parent_trace_id,
            session_name: self.project.as_deref(),
            extra: RunExtra { metadata },
        };

        let resp = self
            .http_client
            .post(format!("{}/runs", self.base_url))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| TracingError::HttpError(err.to_string()))?;

        check_response(resp, "start_trace").await
    }

    async fn end_trace(
        &self,
        trace_id: &str,
        outputs: &Value,
        end_time: Option<SystemTime>,
    ) -> Result<(), TracingError> {
        let body = EndRunBody {
            outputs,
            end_time: format_time(end_time),
        };

        let resp = self
            .http_client
            .patch(format!("{}/runs/{}", self.base_url, trace_id))
            .header("x-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| TracingError::HttpError(err.to_string()))?;

        check_response(resp, "end_trace").await
    }
}
