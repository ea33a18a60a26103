// src/matcher.rs
// GUESS MATCHER
// Exact, then single-token, then fuzzy. First answer (in stored order)
// that satisfies any rule wins. Never mutates the session.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::normalizer::normalize;
use crate::session::SessionStore;

/// Token matches need at least this many normalized guess characters.
pub const MIN_TOKEN_GUESS_LEN: usize = 3;
/// Fuzzy matching needs both sides at least this long.
pub const MIN_FUZZY_LEN: usize = 4;
/// Similarity (0-100) required for a fuzzy match.
pub const FUZZY_THRESHOLD: f64 = 80.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessResult {
    pub correct: bool,
    pub matched_answer: Option<String>,
}

impl GuessResult {
    pub fn miss() -> Self {
        Self {
            correct: false,
            matched_answer: None,
        }
    }

    pub fn hit(answer: impl Into<String>) -> Self {
        Self {
            correct: true,
            matched_answer: Some(answer.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Exact,
    Token,
    Fuzzy,
}

/// Indel similarity on a 0-100 scale: `200 * LCS / (len(a) + len(b))`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];

    200.0 * lcs as f64 / total as f64
}

/// Which rule, if any, matches an already-normalized guess against `answer`.
pub fn match_rule(normalized_guess: &str, answer: &str) -> Option<MatchRule> {
    if normalized_guess.is_empty() {
        return None;
    }

    let normalized_answer = normalize(answer);
    if normalized_guess == normalized_answer {
        return Some(MatchRule::Exact);
    }

    if normalized_guess.len() >= MIN_TOKEN_GUESS_LEN
        && answer
            .split_whitespace()
            .any(|token| normalize(token) == normalized_guess)
    {
        return Some(MatchRule::Token);
    }

    if normalized_guess.len() >= MIN_FUZZY_LEN
        && normalized_answer.len() >= MIN_FUZZY_LEN
        && similarity_ratio(normalized_guess, &normalized_answer) >= FUZZY_THRESHOLD
    {
        return Some(MatchRule::Fuzzy);
    }

    None
}

/// First answer in order that any rule accepts.
pub fn find_match<'a>(guess: &str, answers: &'a [String]) -> Option<(&'a str, MatchRule)> {
    let normalized_guess = normalize(guess);
    if normalized_guess.is_empty() {
        return None;
    }
    answers.iter().find_map(|answer| {
        match_rule(&normalized_guess, answer).map(|rule| (answer.as_str(), rule))
    })
}

#[derive(Clone)]
pub struct GuessMatcher {
    sessions: Arc<dyn SessionStore>,
}

impl GuessMatcher {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Unknown sessions behave like an empty answer list.
    pub fn check_guess(&self, session_id: &str, guess: &str) -> GuessResult {
        let Some(session) = self.sessions.get(session_id) else {
            debug!(session_id, "guess against unknown session");
            return GuessResult::miss();
        };

        match find_match(guess, &session.items) {
            Some((answer, rule)) => {
                debug!(session_id, ?rule, answer, "guess matched");
                GuessResult::hit(answer)
            }
            None => GuessResult::miss(),
        }
    }
}
