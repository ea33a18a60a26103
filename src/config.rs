// src/config.rs
// Process configuration, read once from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the env var holding the API key. The key itself is read at call time.
    pub api_key_var: String,
    pub attempts: u32,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct WikiConfig {
    pub api_url: String,
    pub rest_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub max_entries: usize,
    pub ttl: Duration,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub facts_path: Option<PathBuf>,
    pub model: ModelConfig,
    pub wiki: WikiConfig,
    pub sessions: SessionConfig,
    pub verify_concurrency: usize,
    pub pass_through_unverified: bool,
    pub quiz_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("GUESSAI_BIND").unwrap_or_else(|_| "127.0.0.1:8000".to_string()),
            facts_path: env::var("GUESSAI_FACTS_PATH").ok().map(PathBuf::from),
            model: ModelConfig {
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
                api_key_var: "OPENAI_API_KEY".to_string(),
                attempts: generation_attempts(parse_var("GENERATION_ATTEMPTS")),
                connect_timeout: Duration::from_secs(10),
                read_timeout: Duration::from_secs(60),
            },
            wiki: WikiConfig {
                api_url: env::var("WIKI_API_URL")
                    .unwrap_or_else(|_| "https://en.wikipedia.org/w/api.php".to_string()),
                rest_url: env::var("WIKI_REST_URL")
                    .unwrap_or_else(|_| "https://en.wikipedia.org/api/rest_v1".to_string()),
                user_agent: env::var("GUESSAI_USER_AGENT")
                    .unwrap_or_else(|_| "Guess.ai Quiz/1.0".to_string()),
                connect_timeout: Duration::from_secs(5),
                read_timeout: Duration::from_secs(10),
            },
            sessions: SessionConfig {
                max_entries: parse_var("SESSION_MAX_ENTRIES").unwrap_or(10_000).max(1),
                ttl: Duration::from_secs(parse_var("SESSION_TTL_SECS").unwrap_or(86_400)),
            },
            verify_concurrency: parse_var("VERIFY_CONCURRENCY").unwrap_or(4).max(1),
            pass_through_unverified: env::var("PASS_THROUGH_UNVERIFIED")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),
            quiz_timeout: Duration::from_secs(parse_var("QUIZ_TIMEOUT_SECS").unwrap_or(180)),
        }
    }
}

/// Upper bound on generative calls per request, whatever the environment says.
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

fn generation_attempts(requested: Option<u32>) -> u32 {
    requested
        .unwrap_or(MAX_GENERATION_ATTEMPTS)
        .clamp(1, MAX_GENERATION_ATTEMPTS)
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_flags_accept_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn generation_attempts_are_capped() {
        assert_eq!(generation_attempts(None), 3);
        assert_eq!(generation_attempts(Some(50)), 3);
        assert_eq!(generation_attempts(Some(2)), 2);
        assert_eq!(generation_attempts(Some(0)), 1);
    }
}
