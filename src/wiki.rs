// src/wiki.rs
// THE KNOWLEDGE CODEX
// Talks to the encyclopedia: rendered pages for list scraping, page summaries
// and full-text search for verification.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::WikiConfig;
use crate::error::{QuizError, Result};
use crate::scrape::PageSource;
use crate::verify::KnowledgeSource;

#[derive(Clone)]
pub struct WikiClient {
    client: Client,
    api_url: String,
    rest_url: String,
}

impl WikiClient {
    pub fn new(config: &WikiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            rest_url: config.rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// Rendered HTML of a page, or `None` when the page does not exist.
    pub async fn fetch_rendered(&self, title: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "parse"),
                ("page", title),
                ("format", "json"),
                ("prop", "text"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| QuizError::unavailable(format!("parse request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(QuizError::unavailable(format!(
                "parse request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| QuizError::unavailable(format!("parse response undecodable: {e}")))?;

        if let Some(code) = body.pointer("/error/code").and_then(Value::as_str) {
            debug!(title, code, "encyclopedia has no such page");
            return Ok(None);
        }

        Ok(body
            .pointer("/parse/text/*")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    /// Direct title lookup through the page-summary endpoint.
    pub async fn page_exists(&self, title: &str) -> Result<bool> {
        let url = format!("{}/page/summary/{}", self.rest_url, title_slug(title));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| QuizError::unavailable(format!("summary request failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Err(QuizError::unavailable(format!(
                "summary request returned {status}"
            )))
        } else {
            Ok(false)
        }
    }

    /// Title of the best full-text hit, if any.
    pub async fn search_top_hit(&self, query: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", "1"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| QuizError::unavailable(format!("search request failed: {e}")))?
            .error_for_status()
            .map_err(|e| QuizError::unavailable(format!("search request rejected: {e}")))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| QuizError::unavailable(format!("search response undecodable: {e}")))?;

        Ok(top_search_title(&body))
    }
}

#[async_trait]
impl PageSource for WikiClient {
    async fn rendered_page(&self, title: &str) -> Result<Option<String>> {
        self.fetch_rendered(title).await
    }
}

#[async_trait]
impl KnowledgeSource for WikiClient {
    async fn exists(&self, title: &str) -> Result<bool> {
        self.page_exists(title).await
    }

    async fn search(&self, query: &str) -> Result<Option<String>> {
        self.search_top_hit(query).await
    }
}

/// Summary endpoint expects underscores for spaces, percent-encoded.
fn title_slug(title: &str) -> String {
    urlencoding::encode(&title.trim().replace(' ', "_")).into_owned()
}

fn top_search_title(body: &Value) -> Option<String> {
    body.pointer("/query/search/0/title")
        .and_then(Value::as_str)
        .map(str::to_string)
}
