// src/knowledge.rs
// THE CURATED CODEX
// Hand-maintained topic -> facts mappings. Cheapest and most authoritative
// source, always consulted before anything touches the network.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const SEED_TOPICS: &str = include_str!("../data/seed_topics.json");

/// One multiple-choice record of a quiz-type topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub correct_answer: String,
    pub wrong_answers: Vec<String>,
}

/// Facts stored for a topic: either a flat answer list or MCQ records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Facts {
    List(Vec<String>),
    Quiz(Vec<QuizQuestion>),
}

/// Row shape of the curated store (and of `GUESSAI_FACTS_PATH` files).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicRecord {
    pub topic_name: String,
    pub facts: Facts,
}

pub trait StructuredSource: Send + Sync {
    /// Exact lookup on the trimmed, lowercased topic. `None` on miss.
    fn lookup(&self, topic: &str) -> Option<Facts>;
}

/// Key used for curated topics on both insert and lookup.
pub fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

/// Shuffles MCQ records; no ordering is promised across calls.
pub fn shuffled_questions(mut questions: Vec<QuizQuestion>) -> Vec<QuizQuestion> {
    questions.shuffle(&mut rand::thread_rng());
    questions
}

#[derive(Debug, Clone, Default)]
pub struct FactStore {
    topics: HashMap<String, Facts>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with the bundled seed topics.
    pub fn seeded() -> anyhow::Result<Self> {
        let mut store = Self::new();
        let records: Vec<TopicRecord> =
            serde_json::from_str(SEED_TOPICS).context("bundled seed topics are not valid JSON")?;
        store.extend(records);
        Ok(store)
    }

    /// Merges records from a JSON file; later records override earlier keys.
    pub fn load_file(&mut self, path: &Path) -> anyhow::Result<usize> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read facts file {}", path.display()))?;
        let records: Vec<TopicRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to decode facts file {}", path.display()))?;
        let count = records.len();
        self.extend(records);
        Ok(count)
    }

    pub fn insert(&mut self, topic: &str, facts: Facts) {
        self.topics.insert(topic_key(topic), facts);
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = TopicRecord>) {
        for record in records {
            self.insert(&record.topic_name, record.facts);
        }
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

impl StructuredSource for FactStore {
    fn lookup(&self, topic: &str) -> Option<Facts> {
        self.topics.get(&topic_key(topic)).cloned()
    }
}
