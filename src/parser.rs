// src/parser.rs
// RESPONSE PARSER
// Ordered recovery strategies for turning free model text into a flat list.
// Each strategy either produces items or passes to the next one.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static STRUCTURAL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\{\}\[\]\s,]+$").unwrap());
static JSON_KEY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^"[^"]+"\s*:"#).unwrap());
static HEADER_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\n]{0,80}:$").unwrap());
static LEADING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]+|\d{1,3}[.)]|#\d{1,3}[.):]?)\s*").unwrap());

pub trait ParseStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    /// `None` (or an empty list) hands over to the next strategy.
    fn extract(&self, raw: &str) -> Option<Vec<String>>;
}

/// Whole response is a JSON array of strings.
pub struct JsonArray;

impl ParseStrategy for JsonArray {
    fn name(&self) -> &'static str {
        "json_array"
    }

    fn extract(&self, raw: &str) -> Option<Vec<String>> {
        serde_json::from_str::<Vec<String>>(raw.trim()).ok()
    }
}

/// First `[ ... ]` slice, tolerating extra or missing closing brackets.
pub struct BracketSlice;

impl ParseStrategy for BracketSlice {
    fn name(&self) -> &'static str {
        "bracket_slice"
    }

    fn extract(&self, raw: &str) -> Option<Vec<String>> {
        let start = raw.find('[')?;
        let after = &raw[start + 1..];
        let inner = match after.rfind(']') {
            Some(end) => &after[..end],
            None => after,
        };
        let inner = inner
            .trim_end()
            .trim_end_matches(']')
            .trim_end()
            .trim_end_matches(',');

        if let Ok(items) = serde_json::from_str::<Vec<String>>(&format!("[{inner}]")) {
            return Some(items);
        }

        // Output cut off mid-item: keep everything up to the last complete string.
        let cut = inner.rfind("\",")?;
        serde_json::from_str::<Vec<String>>(&format!("[{}]", &inner[..=cut])).ok()
    }
}

/// One item per line, skipping structure and headers, stripping bullets.
pub struct LineSplit;

impl ParseStrategy for LineSplit {
    fn name(&self) -> &'static str {
        "line_split"
    }

    fn extract(&self, raw: &str) -> Option<Vec<String>> {
        let items: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| !line.starts_with("```"))
            .filter(|line| !STRUCTURAL_LINE.is_match(line))
            .filter(|line| !JSON_KEY_LINE.is_match(line) && !HEADER_LINE.is_match(line))
            .map(|line| {
                let line = LEADING_MARKER.replace(line, "");
                line.trim_start_matches(['[', '"'])
                    .trim_end_matches([']', '"', ','])
                    .trim()
                    .to_string()
            })
            .filter(|line| !line.is_empty())
            .collect();

        Some(items)
    }
}

pub struct ResponseParser {
    strategies: Vec<Box<dyn ParseStrategy>>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            strategies: vec![Box::new(JsonArray), Box::new(BracketSlice), Box::new(LineSplit)],
        }
    }

    pub fn with_strategies(strategies: Vec<Box<dyn ParseStrategy>>) -> Self {
        Self { strategies }
    }

    /// Items from the first strategy that yields anything; empty when none do.
    pub fn parse(&self, raw: &str) -> Vec<String> {
        for strategy in &self.strategies {
            let Some(items) = strategy.extract(raw) else {
                continue;
            };
            let items: Vec<String> = items
                .into_iter()
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect();
            if !items.is_empty() {
                debug!(strategy = strategy.name(), count = items.len(), "parsed model output");
                return items;
            }
        }
        Vec::new()
    }
}
