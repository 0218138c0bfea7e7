use crate::types::ToolError;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use threadgraph_macros::tools;
use tracing::debug;

const DEFAULT_SEARCH_URL: &str = "https://api.duckduckgo.com/";
const DEFAULT_STOCK_API_URL: &str = "https://api.freeapi.app";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const NO_SEARCH_RESULT: &str = "No good DuckDuckGo Search Result was found";

/// Endpoints and limits of the network-backed standard tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardToolsConfig {
    /// DuckDuckGo instant answer API (or anything speaking its JSON)
    pub search_url: String,
    /// Base URL of the market data API serving `/api/v1/public/stocks/{symbol}`
    pub stock_api_url: String,
    pub timeout_secs: u64,
}

impl Default for StandardToolsConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            stock_api_url: DEFAULT_STOCK_API_URL.to_string(),
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CalculatorParams {
    #[schemars(description = "First operand")]
    pub first_num: f64,
    #[schemars(description = "Second operand")]
    pub second_num: f64,
    #[schemars(description = "One of add, subtract, multiply, divide")]
    pub operation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorResponse {
    pub first_num: f64,
    pub second_num: f64,
    pub operation: String,
    pub result: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Search query")]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StockPriceParams {
    #[schemars(description = "Ticker symbol, e.g. TCS or RELIANCE")]
    pub symbol: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic behind the `calculator` tool.
///
/// `subtract` yields the absolute difference, dividing by zero yields `0`, and
/// `multiply` / `divide` are rounded to two decimals.
pub fn calculate(first_num: f64, second_num: f64, operation: &str) -> Result<f64, ToolError> {
    match operation {
        "add" => Ok(first_num + second_num),
        "subtract" => Ok((first_num - second_num).abs()),
        "multiply" => Ok(round2(first_num * second_num)),
        "divide" if second_num == 0.0 => Ok(0.0),
        "divide" => Ok(round2(first_num / second_num)),
        other => Err(ToolError::InvalidArguments(format!(
            "Invalid operation: {}",
            other
        ))),
    }
}

/// Calculator, web search and stock price lookup.
#[derive(Debug, Clone)]
pub struct StandardTools {
    http: Client,
    config: StandardToolsConfig,
}

impl Default for StandardTools {
    fn default() -> Self {
        Self::new(StandardToolsConfig::default())
    }
}

impl StandardTools {
    pub fn new(config: StandardToolsConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    pub fn config(&self) -> &StandardToolsConfig {
        &self.config
    }

    pub(super) fn stock_url(&self, symbol: &str) -> Result<Url, ToolError> {
        let mut url = Url::parse(&self.config.stock_api_url)
            .map_err(|e| ToolError::Execution(format!("bad stock api url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ToolError::Execution("stock api url cannot be a base".into()))?
            .pop_if_empty()
            .extend(["api", "v1", "public", "stocks", symbol]);
        Ok(url)
    }
}

/// Flattens a DuckDuckGo instant answer into plain text snippets.
pub(super) fn search_snippets(body: &Value) -> Vec<String> {
    fn collect_topics(topics: &Value, out: &mut Vec<String>) {
        for topic in topics.as_array().into_iter().flatten() {
            match topic.get("Text").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => out.push(text.to_string()),
                _ => {}
            }
            if let Some(nested) = topic.get("Topics") {
                collect_topics(nested, out);
            }
        }
    }

    let mut snippets = Vec::new();
    for key in ["Answer", "AbstractText", "Definition"] {
        if let Some(text) = body.get(key).and_then(Value::as_str) {
            if !text.is_empty() {
                snippets.push(text.to_string());
            }
        }
    }
    if let Some(topics) = body.get("RelatedTopics") {
        collect_topics(topics, &mut snippets);
    }
    snippets
}

#[tools(
    calculator = "Perform a basic arithmetic operation on two numbers. Supported operations are add, subtract, multiply, divide",
    duckduckgo_search = "A wrapper around DuckDuckGo Search. Useful for when you need to answer questions about current events. Input should be a search query.",
    get_stock_price = "Get the current stock price of the provided symbol of the Indian stock exchange"
)]
impl StandardTools {
    async fn calculator(&self, params: CalculatorParams) -> Result<CalculatorResponse, ToolError> {
        let result = calculate(params.first_num, params.second_num, &params.operation)?;
        Ok(CalculatorResponse {
            first_num: params.first_num,
            second_num: params.second_num,
            operation: params.operation,
            result,
        })
    }

    async fn duckduckgo_search(&self, params: SearchParams) -> Result<String, ToolError> {
        debug!(query = %params.query, "web search");
        let response = self
            .http
            .get(&self.config.search_url)
            .query(&[
                ("q", params.query.as_str()),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Execution(format!(
                "search failed: HTTP {}",
                status
            )));
        }

        let body: Value = response.json().await?;
        let snippets = search_snippets(&body);
        if snippets.is_empty() {
            Ok(NO_SEARCH_RESULT.to_string())
        } else {
            Ok(snippets.join("\n"))
        }
    }

    async fn get_stock_price(&self, params: StockPriceParams) -> Result<Value, ToolError> {
        let url = self.stock_url(&params.symbol)?;
        debug!(%url, "stock price lookup");
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        // The body is handed back verbatim, error payloads included.
        response
            .json::<Value>()
            .await
            .map_err(|e| ToolError::Execution(format!("stock api returned non-JSON body: {}", e)))
    }
}
