// src/generator.rs
// GENERATIVE FALLBACK
// Asks the model for a flat list of real-world items for a topic, honouring
// an explicit count when the topic asks for one.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::brain::{ChatBrain, ChatMessage, CompletionRequest};
use crate::error::{QuizError, Result};
use crate::normalizer::dedupe_normalized;
use crate::parser::ResponseParser;

/// Hard cap on quiz size, requested or not.
pub const MAX_ITEMS: usize = 500;

const TOKENS_PER_ITEM: usize = 50;
const MAX_OUTPUT_TOKENS: usize = 2000;
const TEMPERATURE: f32 = 0.2;

const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates a \"guess-the-list\" quiz.\n\
When given a topic, respond with *only* a JSON array of strings, \
each string being a correct, real-world instance of that topic.\n\
\n\
IMPORTANT:\n\
- Do not add commentary, keys, numbering or nested arrays.\n\
- Each entry is an answer, never a question.\n\
- Only interpret a number as \"I want exactly N items\" if it is clearly a count request, \
e.g. \"top 10 presidents\", \"5 items\", \"# of 7 champions\".\n\
- Do NOT treat standalone years (e.g. \"2010\") or other numbers buried in context as counts.";

static COUNT_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:top|first|last)\s+(\d+)\b|#\s*of\s+(\d+)\b|\b(\d+)\s+(?:items|questions|members)\b|^\s*(\d{1,3})\s+[a-z]",
    )
    .unwrap()
});

/// Explicit item count requested by the topic text, clamped to [`MAX_ITEMS`].
/// A bare leading number only counts up to three digits, so years never do.
pub fn parse_desired_count(topic: &str) -> Option<usize> {
    let captures = COUNT_DIRECTIVE.captures(topic)?;
    let digits = (1..=4).find_map(|i| captures.get(i))?.as_str();
    // Only digits get here, so a parse failure means overflow.
    let n = digits.parse::<usize>().unwrap_or(usize::MAX);
    (n > 0).then(|| n.min(MAX_ITEMS))
}

pub fn build_request(topic: &str, desired: Option<usize>) -> CompletionRequest {
    let (user_prompt, max_tokens) = match desired {
        Some(n) => (
            format!(
                "Generate a JSON array of **exactly** {n} items to guess for the topic: \"{topic}\"."
            ),
            (TOKENS_PER_ITEM * n).min(MAX_OUTPUT_TOKENS),
        ),
        None => (
            format!("Generate a JSON array of items to guess for the topic: \"{topic}\"."),
            MAX_OUTPUT_TOKENS,
        ),
    };

    CompletionRequest {
        messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)],
        max_tokens,
        temperature: TEMPERATURE,
    }
}

/// Unverified model output for a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedList {
    pub items: Vec<String>,
    pub requested: Option<usize>,
}

pub struct ListGenerator {
    brain: Arc<dyn ChatBrain>,
    parser: ResponseParser,
}

impl ListGenerator {
    pub fn new(brain: Arc<dyn ChatBrain>) -> Self {
        Self {
            brain,
            parser: ResponseParser::new(),
        }
    }

    /// Only configuration errors and exhausted timeouts are returned as errors;
    /// any other failure yields an empty list.
    pub async fn generate(&self, topic: &str) -> Result<GeneratedList> {
        let requested = parse_desired_count(topic);
        let request = build_request(topic, requested);

        let raw = match self.brain.complete(&request).await {
            Ok(raw) => raw,
            Err(e @ (QuizError::Configuration(_) | QuizError::GatewayTimeout { .. })) => {
                return Err(e)
            }
            Err(e) => {
                warn!(topic, error = %e, "generative model call failed");
                return Ok(GeneratedList {
                    items: Vec::new(),
                    requested,
                });
            }
        };

        let limit = requested.unwrap_or(MAX_ITEMS);
        let mut items = dedupe_normalized(self.parser.parse(&raw));
        items.truncate(limit);

        if items.is_empty() {
            warn!(topic, "model output had no usable items");
        } else {
            info!(topic, count = items.len(), requested = ?requested, "generated candidates");
        }

        Ok(GeneratedList { items, requested })
    }
}
