// src/scrape.rs
// THE LIST SCOUT
// Best-effort: turns "List of {topic}" encyclopedia pages into answer items.
// Never fails; anything unusable comes back as an empty list.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::error::Result;

/// Fewer entries than this is treated as "no usable list".
pub const MIN_LIST_ITEMS: usize = 5;

static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(?:\d+|[a-z]|citation needed)\]").unwrap());

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Rendered HTML for `title`, `Ok(None)` when the page does not exist.
    async fn rendered_page(&self, title: &str) -> Result<Option<String>>;
}

pub struct ListScraper {
    source: Arc<dyn PageSource>,
    min_items: usize,
}

impl ListScraper {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            min_items: MIN_LIST_ITEMS,
        }
    }

    pub fn min_items(&self) -> usize {
        self.min_items
    }

    pub async fn scrape(&self, topic: &str) -> Vec<String> {
        let title = list_page_title(topic);

        let html = match self.source.rendered_page(&title).await {
            Ok(Some(html)) => html,
            Ok(None) => {
                debug!(%title, "no list page");
                return Vec::new();
            }
            Err(e) => {
                warn!(%title, error = %e, "list page fetch failed");
                return Vec::new();
            }
        };

        let items = extract_list_items(&html);
        if items.len() < self.min_items {
            debug!(%title, found = items.len(), "list too short to quiz on");
            return Vec::new();
        }

        info!(%title, count = items.len(), "scraped list page");
        items
    }
}

pub fn list_page_title(topic: &str) -> String {
    format!("List of {}", topic.trim())
}

/// Top-level `<li>` texts of the first `<ul>` with more than one entry.
pub fn extract_list_items(html: &str) -> Vec<String> {
    let document = Html::parse_fragment(html);
    let Ok(list_selector) = Selector::parse("ul") else {
        return Vec::new();
    };

    for list in document.select(&list_selector) {
        let entries: Vec<ElementRef> = list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li")
            .collect();

        if entries.len() <= 1 {
            continue;
        }

        return entries
            .into_iter()
            .filter_map(|li| clean_entry(&li.text().collect::<String>()))
            .collect();
    }

    Vec::new()
}

/// "Name – description [3]" -> "Name". Nested sub-lists start on a new line
/// and are dropped.
fn clean_entry(raw: &str) -> Option<String> {
    let first_line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let head = first_line.split('–').next().unwrap_or(first_line);
    let text = CITATION.replace_all(head, "");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
