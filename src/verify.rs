// src/verify.rs
// THE FACT CHECK
// Keeps only candidates the knowledge source confirms exist. Per-item misses
// and per-item failures are dropped; losing the source for the whole batch is
// an error the caller decides how to handle.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::error::Result;

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Direct title lookup.
    async fn exists(&self, title: &str) -> Result<bool>;

    /// Title of the top full-text hit, if any.
    async fn search(&self, query: &str) -> Result<Option<String>>;
}

pub struct Verifier {
    source: Arc<dyn KnowledgeSource>,
    concurrency: usize,
}

impl Verifier {
    pub fn new(source: Arc<dyn KnowledgeSource>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    /// Order-preserving subsequence of `candidates` that could be confirmed.
    /// A failed check drops that candidate only; the source counts as
    /// unavailable when every check fails.
    pub async fn verify(&self, candidates: &[String]) -> Result<Vec<String>> {
        let checked: Vec<(String, Result<bool>)> = stream::iter(candidates.iter().cloned())
            .map(|candidate| async move {
                let outcome = self.confirm(&candidate).await;
                (candidate, outcome)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut verified = Vec::new();
        let mut failed = 0;
        let mut last_error = None;
        for (candidate, outcome) in checked {
            match outcome {
                Ok(true) => verified.push(candidate),
                Ok(false) => {}
                Err(e) => {
                    warn!(candidate = %candidate, error = %e, "check failed; dropping candidate");
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed > 0 && failed == candidates.len() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(
            candidates = candidates.len(),
            verified = verified.len(),
            failed,
            "verification finished"
        );
        Ok(verified)
    }

    /// Title lookup first; otherwise the top search hit must itself exist.
    /// The original candidate text is what gets kept either way.
    async fn confirm(&self, candidate: &str) -> Result<bool> {
        if self.source.exists(candidate).await? {
            return Ok(true);
        }

        match self.source.search(candidate).await? {
            Some(hit) => {
                let confirmed = self.source.exists(&hit).await?;
                debug!(candidate, %hit, confirmed, "confirmed through search");
                Ok(confirmed)
            }
            None => {
                debug!(candidate, "dropped unverifiable candidate");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuizError;
    use std::collections::HashMap;
    use std::time::Duration;

    #[derive(Default)]
    struct StubSource {
        pages: Vec<&'static str>,
        search_hits: HashMap<&'static str, &'static str>,
        rate_limited: Vec<&'static str>,
        offline: bool,
    }

    #[async_trait]
    impl KnowledgeSource for StubSource {
        async fn exists(&self, title: &str) -> Result<bool> {
            if self.offline {
                return Err(QuizError::unavailable("connection refused"));
            }
            if self.rate_limited.iter().any(|t| *t == title) {
                return Err(QuizError::unavailable("summary request returned 429"));
            }
            // Short titles answer last, so completion order differs from input order.
            tokio::time::sleep(Duration::from_millis(10 * (5 - title.len().min(5)) as u64)).await;
            Ok(self.pages.iter().any(|page| *page == title))
        }

        async fn search(&self, query: &str) -> Result<Option<String>> {
            Ok(self.search_hits.get(query).map(|hit| hit.to_string()))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn keeps_confirmed_in_order() {
        let source = StubSource {
            pages: vec!["Duke", "Elon", "NC State"],
            ..Default::default()
        };
        let verifier = Verifier::new(Arc::new(source), 4);

        let out = verifier
            .verify(&strings(&["NC State", "Hogwarts", "Duke", "Elon"]))
            .await
            .unwrap();
        assert_eq!(out, vec!["NC State", "Duke", "Elon"]);
    }

    #[tokio::test]
    async fn search_hit_confirms_original_text() {
        let mut search_hits = HashMap::new();
        search_hits.insert("Lonnie Alameda", "Lonni Alameda");
        search_hits.insert("Fake Person", "Nonexistent Page");
        let source = StubSource {
            pages: vec!["Lonni Alameda"],
            search_hits,
            ..Default::default()
        };
        let verifier = Verifier::new(Arc::new(source), 2);

        let out = verifier
            .verify(&strings(&["Lonnie Alameda", "Fake Person"]))
            .await
            .unwrap();
        assert_eq!(out, vec!["Lonnie Alameda"]);
    }

    #[tokio::test]
    async fn unreachable_source_is_an_error() {
        let source = StubSource {
            offline: true,
            ..Default::default()
        };
        let err = Verifier::new(Arc::new(source), 4)
            .verify(&strings(&["Duke"]))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "adapter_unavailable");
    }

    #[tokio::test]
    async fn one_failed_check_only_drops_that_item() {
        let source = StubSource {
            pages: vec!["Mercury", "Venus", "Earth"],
            rate_limited: vec!["Mars"],
            ..Default::default()
        };
        let verifier = Verifier::new(Arc::new(source), 4);

        let out = verifier
            .verify(&strings(&["Mercury", "Venus", "Zorblax", "Mars", "Earth"]))
            .await
            .unwrap();
        assert_eq!(out, vec!["Mercury", "Venus", "Earth"]);
    }

    #[tokio::test]
    async fn every_check_failing_is_an_error() {
        let source = StubSource {
            rate_limited: vec!["Mars", "Pluto"],
            ..Default::default()
        };
        let err = Verifier::new(Arc::new(source), 2)
            .verify(&strings(&["Mars", "Pluto"]))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "adapter_unavailable");
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let verifier = Verifier::new(Arc::new(StubSource::default()), 0);
        assert!(verifier.verify(&[]).await.unwrap().is_empty());
    }
}
