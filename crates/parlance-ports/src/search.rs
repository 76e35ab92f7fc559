//! Knowledge queries via an external search API.
//!
//! Supports configurable backend (SearXNG, Brave). Results are flattened into
//! a plaintext block the planner can record as a thought.

use async_trait::async_trait;
use tracing::debug;

use parlance_core::error::{ParlanceError, Result};

use crate::KnowledgeQuery;

const MAX_RESULTS: usize = 5;

pub struct SearchKnowledge {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

/// Parse SearXNG JSON results.
fn parse_searxng_results(body: &serde_json::Value, max: usize) -> Vec<SearchResult> {
    let empty = vec![];
    let results = body["results"].as_array().unwrap_or(&empty);
    results
        .iter()
        .take(max)
        .filter_map(|r| {
            Some(SearchResult {
                title: r["title"].as_str()?.to_string(),
                url: r["url"].as_str()?.to_string(),
                snippet: r["content"].as_str().unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Parse Brave Search API results.
fn parse_brave_results(body: &serde_json::Value, max: usize) -> Vec<SearchResult> {
    let empty = vec![];
    let results = body["web"]["results"].as_array().unwrap_or(&empty);
    results
        .iter()
        .take(max)
        .filter_map(|r| {
            Some(SearchResult {
                title: r["title"].as_str()?.to_string(),
                url: r["url"].as_str()?.to_string(),
                snippet: r["description"].as_str().unwrap_or("").to_string(),
            })
        })
        .collect()
}

/// Flatten results into the plaintext block recorded as a thought.
fn format_results(question: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for: {question}");
    }
    let mut output = format!("Top {} results for {question}\n", results.len());
    for result in results {
        output.push_str(&format!(
            "\n{} ({})\n{}\n",
            result.title, result.url, result.snippet
        ));
    }
    output
}

impl SearchKnowledge {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl KnowledgeQuery for SearchKnowledge {
    async fn query(&self, question: &str) -> Result<String> {
        debug!(query = %question, "Knowledge query");

        // Detect API type from URL
        let is_brave = self.base_url.contains("brave.com");

        let request = if is_brave {
            let key = self.api_key.clone().unwrap_or_default();
            self.client
                .get(format!("{}/res/v1/web/search", self.base_url))
                .header("X-Subscription-Token", key)
                .query(&[("q", question), ("count", &MAX_RESULTS.to_string())])
        } else {
            // SearXNG-compatible
            self.client.get(format!("{}/search", self.base_url)).query(&[
                ("q", question),
                ("format", "json"),
                ("engines", "google,duckduckgo"),
            ])
        };

        let response = request
            .send()
            .await
            .map_err(|e| ParlanceError::QueryFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ParlanceError::QueryFailed(format!(
                "search API returned HTTP {}",
                response.status()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ParlanceError::QueryFailed(e.to_string()))?;

        let results = if is_brave {
            parse_brave_results(&body, MAX_RESULTS)
        } else {
            parse_searxng_results(&body, MAX_RESULTS)
        };

        Ok(format_results(question, &results))
    }
}
