//! Web and encyclopedia search tools
//!
//! Both adapters decode their API response into [`Snippet`]s.

use super::parse_args;
use crate::capability::Capability;
use crate::error::{Error, Result};
use crate::payload::{Payload, Snippet};
use crate::registry::{Tool, ToolDefinition, ToolResult};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::debug;

const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";
const WIKIPEDIA_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Results requested from Tavily
const TAVILY_MAX_RESULTS: usize = 5;

/// Results requested from Wikipedia
const WIKIPEDIA_MAX_RESULTS: usize = 3;

/// HTTP timeout for search requests (seconds)
const SEARCH_TIMEOUT_SECS: u64 = 15;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("TAG_REGEX is a compile-time constant"));

#[derive(Debug, Deserialize)]
struct QueryArgs {
    query: String,
}

fn query_schema(description: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": { "type": "string", "description": description }
        },
        "required": ["query"]
    })
}

fn parse_query(input: serde_json::Value) -> Result<String> {
    let args: QueryArgs = parse_args(input)?;
    let query = args.query.trim().to_string();
    if query.is_empty() {
        return Err(Error::InvalidInput("Query must not be empty".to_string()));
    }
    Ok(query)
}

fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
        .user_agent(concat!("adpilot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Unavailable(format!("failed to build HTTP client: {}", e)))
}

fn network_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(SEARCH_TIMEOUT_SECS * 1000)
    } else {
        Error::Network(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
}

fn tavily_snippets(response: TavilyResponse) -> Vec<Snippet> {
    response
        .results
        .into_iter()
        .map(|r| {
            Snippet::new(r.title, r.content)
                .with_source(r.url)
                .with_score(r.score)
        })
        .collect()
}

/// Web search through the Tavily API
pub struct TavilySearchTool {
    definition: ToolDefinition,
    client: Client,
    api_key: String,
}

impl TavilySearchTool {
    /// Create the tool
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let definition = ToolDefinition::new(
            Capability::WebSearch,
            "Search the web for current marketing news, trends and benchmarks.",
        )
        .with_parameters(query_schema("Search query"));

        Ok(Self {
            definition,
            client: build_client()?,
            api_key: api_key.into(),
        })
    }
}

#[async_trait::async_trait]
impl Tool for TavilySearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let query = parse_query(input)?;

        let response = self
            .client
            .post(TAVILY_ENDPOINT)
            .json(&serde_json::json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": TAVILY_MAX_RESULTS,
                "search_depth": "basic",
            }))
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Execution(format!(
                "tavily returned {}: {}",
                status,
                adpilot_llm::util::sanitize_api_error(&body)
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| Error::Execution(format!("unexpected tavily response: {}", e)))?;
        let snippets = tavily_snippets(body);
        debug!(query = %query, results = snippets.len(), "Web search completed");

        Ok(ToolResult::success(
            Payload::Snippets(snippets),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct WikipediaResponse {
    query: Option<WikipediaQuery>,
}

#[derive(Debug, Deserialize)]
struct WikipediaQuery {
    #[serde(default)]
    search: Vec<WikipediaHit>,
}

#[derive(Debug, Deserialize)]
struct WikipediaHit {
    title: String,
    #[serde(default)]
    snippet: String,
}

fn clean_snippet(html: &str) -> String {
    TAG_REGEX
        .replace_all(html, "")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn wikipedia_snippets(response: WikipediaResponse) -> Vec<Snippet> {
    let hits = response.query.map(|q| q.search).unwrap_or_default();
    let total = hits.len();
    hits.into_iter()
        .enumerate()
        .map(|(rank, hit)| {
            let url = format!(
                "https://en.wikipedia.org/wiki/{}",
                hit.title.replace(' ', "_")
            );
            Snippet::new(hit.title, clean_snippet(&hit.snippet))
                .with_source(url)
                .with_score((total - rank) as f64 / total as f64)
        })
        .collect()
}

/// Encyclopedia search through the Wikipedia API
pub struct WikipediaSearchTool {
    definition: ToolDefinition,
    client: Client,
}

impl WikipediaSearchTool {
    /// Create the tool
    pub fn new() -> Result<Self> {
        let definition = ToolDefinition::new(
            Capability::EncyclopediaSearch,
            "Search Wikipedia for background on marketing concepts, brands and industries.",
        )
        .with_parameters(query_schema("Topic to look up"));

        Ok(Self {
            definition,
            client: build_client()?,
        })
    }
}

#[async_trait::async_trait]
impl Tool for WikipediaSearchTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let query = parse_query(input)?;

        let url = format!(
            "{}?action=query&list=search&format=json&srlimit={}&srsearch={}",
            WIKIPEDIA_ENDPOINT,
            WIKIPEDIA_MAX_RESULTS,
            urlencoding::encode(&query)
        );
        let response = self.client.get(url).send().await.map_err(network_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Execution(format!("wikipedia returned {}", status)));
        }

        let body: WikipediaResponse = response
            .json()
            .await
            .map_err(|e| Error::Execution(format!("unexpected wikipedia response: {}", e)))?;
        let snippets = wikipedia_snippets(body);
        debug!(query = %query, results = snippets.len(), "Encyclopedia search completed");

        Ok(ToolResult::success(
            Payload::Snippets(snippets),
            start.elapsed().as_millis() as u64,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tavily_decoding() {
        let response: TavilyResponse = serde_json::from_value(serde_json::json!({
            "query": "instagram reels trends",
            "results": [
                {"title": "Reels in 2025", "url": "https://example.com/reels", "content": "Short video keeps growing", "score": 0.91},
                {"title": "No content", "url": "https://example.com/empty"}
            ]
        }))
        .unwrap();

        let snippets = tavily_snippets(response);
        assert_eq!(snippets.len(), 2);
        assert_eq!(snippets[0].source.as_deref(), Some("https://example.com/reels"));
        assert_eq!(snippets[1].content, "");
    }

    #[test]
    fn test_wikipedia_decoding() {
        let response: WikipediaResponse = serde_json::from_value(serde_json::json!({
            "query": {"search": [
                {"title": "Influencer marketing", "snippet": "<span class=\"searchmatch\">Influencer</span> &quot;marketing&quot;"},
                {"title": "Social media", "snippet": ""}
            ]}
        }))
        .unwrap();

        let snippets = wikipedia_snippets(response);
        assert_eq!(snippets[0].content, "Influencer \"marketing\"");
        assert_eq!(
            snippets[0].source.as_deref(),
            Some("https://en.wikipedia.org/wiki/Influencer_marketing")
        );
        assert!(snippets[0].score > snippets[1].score);

        let empty: WikipediaResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(wikipedia_snippets(empty).is_empty());
    }

    #[tokio::test]
    async fn test_blank_query_rejected_before_io() {
        let tool = WikipediaSearchTool::new().unwrap();
        let err = tool.execute(serde_json::json!({"query": "   "})).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
