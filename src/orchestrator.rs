// src/orchestrator.rs
// QUIZ ORCHESTRATOR
// curated facts -> list scrape -> generative fallback, then verification,
// dedupe, cap, and a fresh session. Nothing is stored until the whole
// cascade has finished.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{QuizError, Result};
use crate::generator::{parse_desired_count, ListGenerator, MAX_ITEMS};
use crate::knowledge::{shuffled_questions, Facts, QuizQuestion, StructuredSource};
use crate::normalizer::dedupe_normalized;
use crate::scrape::ListScraper;
use crate::session::SessionStore;
use crate::verify::Verifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Quiz {
    List { items: Vec<String> },
    Mcq { questions: Vec<QuizQuestion> },
}

impl Quiz {
    /// Flat list of correct answers, which is all the guess matcher needs.
    pub fn answers(&self) -> Vec<String> {
        match self {
            Quiz::List { items } => items.clone(),
            Quiz::Mcq { questions } => {
                dedupe_normalized(questions.iter().map(|q| q.correct_answer.clone()))
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Quiz::List { items } => items.len(),
            Quiz::Mcq { questions } => questions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizSource {
    Curated,
    Scraped,
    Generated,
}

#[derive(Debug, Clone)]
pub struct GeneratedQuiz {
    pub session_id: String,
    pub quiz: Quiz,
    pub source: QuizSource,
    pub requested_count: Option<usize>,
}

impl GeneratedQuiz {
    /// True when the topic asked for N items and fewer came back.
    pub fn is_short(&self) -> bool {
        self.requested_count
            .map(|n| self.quiz.len() < n)
            .unwrap_or(false)
    }
}

pub struct QuizOrchestrator {
    structured: Arc<dyn StructuredSource>,
    scraper: ListScraper,
    generator: ListGenerator,
    verifier: Verifier,
    sessions: Arc<dyn SessionStore>,
    pass_through_unverified: bool,
}

impl QuizOrchestrator {
    pub fn new(
        structured: Arc<dyn StructuredSource>,
        scraper: ListScraper,
        generator: ListGenerator,
        verifier: Verifier,
        sessions: Arc<dyn SessionStore>,
        pass_through_unverified: bool,
    ) -> Self {
        Self {
            structured,
            scraper,
            generator,
            verifier,
            sessions,
            pass_through_unverified,
        }
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    /// Runs the cascade under a deadline. On expiry the in-flight adapter calls
    /// are dropped and no session is created.
    pub async fn generate_quiz_within(&self, topic: &str, deadline: Duration) -> Result<GeneratedQuiz> {
        match tokio::time::timeout(deadline, self.generate_quiz(topic)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(topic, ?deadline, "quiz generation deadline exceeded");
                Err(QuizError::Timeout(deadline))
            }
        }
    }

    pub async fn generate_quiz(&self, topic: &str) -> Result<GeneratedQuiz> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(QuizError::invalid_input("topic must not be empty"));
        }

        let requested_count = parse_desired_count(topic);
        let limit = requested_count.unwrap_or(MAX_ITEMS).min(MAX_ITEMS);

        let (quiz, source) = match self.structured.lookup(topic) {
            Some(facts) => {
                info!(topic, "curated topic hit");
                (curated_quiz(facts, limit), QuizSource::Curated)
            }
            None => {
                let scraped = self.scraper.scrape(topic).await;
                let (candidates, source) = if scraped.len() >= self.scraper.min_items() {
                    (scraped, QuizSource::Scraped)
                } else {
                    let generated = self.generator.generate(topic).await?;
                    (generated.items, QuizSource::Generated)
                };

                let mut items = dedupe_normalized(self.filter_verified(candidates).await);
                items.truncate(limit);
                (Quiz::List { items }, source)
            }
        };

        let session_id = Uuid::new_v4().to_string();
        self.sessions.put(session_id.clone(), quiz.answers());

        let generated = GeneratedQuiz {
            session_id,
            quiz,
            source,
            requested_count,
        };

        if generated.is_short() {
            warn!(
                topic,
                requested = ?requested_count,
                returned = generated.quiz.len(),
                "returned fewer items than requested"
            );
        }
        info!(
            topic,
            session_id = %generated.session_id,
            source = ?generated.source,
            count = generated.quiz.len(),
            "quiz ready"
        );

        Ok(generated)
    }

    async fn filter_verified(&self, candidates: Vec<String>) -> Vec<String> {
        if candidates.is_empty() {
            return candidates;
        }

        match self.verifier.verify(&candidates).await {
            Ok(verified) if verified.is_empty() && self.pass_through_unverified => {
                warn!(
                    candidates = candidates.len(),
                    "nothing verified; returning unverified candidates"
                );
                candidates
            }
            Ok(verified) => verified,
            Err(e) => {
                warn!(error = %e, "verification unavailable; returning unverified candidates");
                candidates
            }
        }
    }
}

fn curated_quiz(facts: Facts, limit: usize) -> Quiz {
    match facts {
        Facts::List(items) => {
            let mut items = dedupe_normalized(items);
            items.truncate(limit);
            Quiz::List { items }
        }
        Facts::Quiz(questions) => {
            let mut questions = shuffled_questions(questions);
            questions.truncate(limit);
            Quiz::Mcq { questions }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{ChatBrain, CompletionRequest};
    use crate::config::SessionConfig;
    use crate::knowledge::FactStore;
    use crate::normalizer::normalize;
    use crate::scrape::PageSource;
    use crate::session::MemorySessionStore;
    use crate::verify::KnowledgeSource;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Pages {
        html: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource for Pages {
        async fn rendered_page(&self, _title: &str) -> Result<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.html.clone())
        }
    }

    struct Brain {
        reply: String,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl Brain {
        fn replying(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatBrain for Brain {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(self.reply.clone())
        }
    }

    enum Knowledge {
        Knows(Vec<&'static str>),
        RateLimits {
            pages: Vec<&'static str>,
            failing: &'static str,
        },
        Offline,
    }

    #[async_trait]
    impl KnowledgeSource for Knowledge {
        async fn exists(&self, title: &str) -> Result<bool> {
            match self {
                Knowledge::Knows(pages) => Ok(pages.iter().any(|p| *p == title)),
                Knowledge::RateLimits { failing, .. } if *failing == title => {
                    Err(QuizError::unavailable("summary request returned 429"))
                }
                Knowledge::RateLimits { pages, .. } => Ok(pages.iter().any(|p| *p == title)),
                Knowledge::Offline => Err(QuizError::unavailable("offline")),
            }
        }

        async fn search(&self, _query: &str) -> Result<Option<String>> {
            match self {
                Knowledge::Knows(_) | Knowledge::RateLimits { .. } => Ok(None),
                Knowledge::Offline => Err(QuizError::unavailable("offline")),
            }
        }
    }

    struct Fixture {
        pages: Arc<Pages>,
        brain: Arc<Brain>,
        sessions: Arc<MemorySessionStore>,
        orchestrator: QuizOrchestrator,
    }

    fn fixture(pages: Pages, brain: Brain, knowledge: Knowledge, pass_through: bool) -> Fixture {
        let pages = Arc::new(pages);
        let brain = Arc::new(brain);
        let sessions = Arc::new(MemorySessionStore::new(&SessionConfig {
            max_entries: 64,
            ttl: Duration::from_secs(60),
        }));
        let orchestrator = QuizOrchestrator::new(
            Arc::new(FactStore::seeded().unwrap()),
            ListScraper::new(pages.clone()),
            ListGenerator::new(brain.clone()),
            Verifier::new(Arc::new(knowledge), 4),
            sessions.clone(),
            pass_through,
        );
        Fixture {
            pages,
            brain,
            sessions,
            orchestrator,
        }
    }

    fn list_html(items: &[&str]) -> String {
        let lis: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
        format!("<ul>{lis}</ul>")
    }

    fn list_items(quiz: &Quiz) -> &[String] {
        match quiz {
            Quiz::List { items } => items,
            Quiz::Mcq { .. } => panic!("expected list quiz"),
        }
    }

    #[tokio::test]
    async fn curated_topic_skips_network() {
        let f = fixture(Pages::default(), Brain::replying("[]"), Knowledge::Offline, true);

        let quiz = f.orchestrator.generate_quiz("  NC Colleges ").await.unwrap();
        assert_eq!(quiz.source, QuizSource::Curated);
        let expected = match FactStore::seeded().unwrap().lookup("nc colleges") {
            Some(Facts::List(items)) => items,
            _ => unreachable!(),
        };
        assert_eq!(list_items(&quiz.quiz), expected.as_slice());
        assert_eq!(f.pages.calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.brain.calls.load(Ordering::SeqCst), 0);

        let stored = f.sessions.get(&quiz.session_id).unwrap();
        assert_eq!(stored.items, expected);
    }

    #[tokio::test]
    async fn curated_mcq_stores_correct_answers() {
        let f = fixture(Pages::default(), Brain::replying("[]"), Knowledge::Offline, true);

        let quiz = f
            .orchestrator
            .generate_quiz("florida state softball coaches")
            .await
            .unwrap();
        let Quiz::Mcq { questions } = &quiz.quiz else {
            panic!("expected mcq quiz");
        };
        assert_eq!(questions.len(), 5);

        let stored: HashSet<String> = f
            .sessions
            .get(&quiz.session_id)
            .unwrap()
            .items
            .iter()
            .cloned()
            .collect();
        assert!(stored.contains("Lonni Alameda"));
        assert!(stored.contains("ACC"));
        assert_eq!(stored.len(), 5);
    }

    #[tokio::test]
    async fn scraped_list_is_verified() {
        let html = list_html(&["Duke", "Elon", "Davidson", "Hogwarts", "Campbell", "Queens"]);
        let f = fixture(
            Pages {
                html: Some(html),
                ..Default::default()
            },
            Brain::replying("[]"),
            Knowledge::Knows(vec!["Duke", "Elon", "Davidson", "Campbell", "Queens"]),
            true,
        );

        let quiz = f.orchestrator.generate_quiz("colleges in NC").await.unwrap();
        assert_eq!(quiz.source, QuizSource::Scraped);
        assert_eq!(
            list_items(&quiz.quiz),
            ["Duke", "Elon", "Davidson", "Campbell", "Queens"]
        );
        assert_eq!(f.brain.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_scrape_falls_back_to_generation() {
        let f = fixture(
            Pages {
                html: Some(list_html(&["A", "B"])),
                ..Default::default()
            },
            Brain::replying(r#"["Mercury", "Venus", "Pluto", "Earth"]"#),
            Knowledge::Knows(vec!["Mercury", "Venus", "Earth"]),
            true,
        );

        let quiz = f.orchestrator.generate_quiz("planets").await.unwrap();
        assert_eq!(quiz.source, QuizSource::Generated);
        assert_eq!(list_items(&quiz.quiz), ["Mercury", "Venus", "Earth"]);
        assert_eq!(f.pages.calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.brain.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_verified_passes_through_when_enabled() {
        let reply = r#"["Zorblax", "Quenthor"]"#;
        let f = fixture(Pages::default(), Brain::replying(reply), Knowledge::Knows(vec![]), true);
        let quiz = f.orchestrator.generate_quiz("alien kings").await.unwrap();
        assert_eq!(list_items(&quiz.quiz), ["Zorblax", "Quenthor"]);

        let f = fixture(Pages::default(), Brain::replying(reply), Knowledge::Knows(vec![]), false);
        let quiz = f.orchestrator.generate_quiz("alien kings").await.unwrap();
        assert!(quiz.quiz.is_empty());
        assert!(f.sessions.get(&quiz.session_id).unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn offline_verification_passes_through() {
        let f = fixture(
            Pages::default(),
            Brain::replying(r#"["Nile", "Amazon"]"#),
            Knowledge::Offline,
            false,
        );
        let quiz = f.orchestrator.generate_quiz("rivers").await.unwrap();
        assert_eq!(list_items(&quiz.quiz), ["Nile", "Amazon"]);
    }

    #[tokio::test]
    async fn rate_limited_item_does_not_disable_verification() {
        let f = fixture(
            Pages::default(),
            Brain::replying(r#"["Mercury", "Venus", "Zorblax", "Quenthor", "Earth", "Mars"]"#),
            Knowledge::RateLimits {
                pages: vec!["Mercury", "Venus", "Earth"],
                failing: "Mars",
            },
            false,
        );
        let quiz = f.orchestrator.generate_quiz("planets").await.unwrap();
        assert_eq!(list_items(&quiz.quiz), ["Mercury", "Venus", "Earth"]);
    }

    #[tokio::test]
    async fn requested_count_caps_and_flags_shortfall() {
        let f = fixture(
            Pages::default(),
            Brain::replying(r#"["Parasite", "Moonlight", "CODA"]"#),
            Knowledge::Knows(vec!["Parasite", "Moonlight"]),
            true,
        );
        let quiz = f
            .orchestrator
            .generate_quiz("top 5 Oscar Best Picture winners")
            .await
            .unwrap();
        assert_eq!(quiz.requested_count, Some(5));
        assert_eq!(list_items(&quiz.quiz), ["Parasite", "Moonlight"]);
        assert!(quiz.is_short());
    }

    #[tokio::test]
    async fn results_are_unique_and_capped() {
        let many: Vec<String> = (0..700).map(|i| format!("Item {}", i % 650)).collect();
        let f = fixture(
            Pages::default(),
            Brain::replying(&serde_json::to_string(&many).unwrap()),
            Knowledge::Offline,
            true,
        );
        let quiz = f.orchestrator.generate_quiz("things").await.unwrap();
        let items = list_items(&quiz.quiz);
        assert_eq!(items.len(), MAX_ITEMS);
        let keys: HashSet<String> = items.iter().map(|i| normalize(i)).collect();
        assert_eq!(keys.len(), items.len());
    }

    #[tokio::test]
    async fn empty_topic_is_rejected() {
        let f = fixture(Pages::default(), Brain::replying("[]"), Knowledge::Offline, true);
        let err = f.orchestrator.generate_quiz("   ").await.unwrap_err();
        assert_eq!(err.category(), "invalid_input");
        assert!(f.sessions.is_empty());
    }

    #[tokio::test]
    async fn deadline_leaves_no_session() {
        let brain = Brain {
            reply: r#"["Slow"]"#.to_string(),
            delay: Duration::from_secs(5),
            calls: AtomicUsize::new(0),
        };
        let f = fixture(Pages::default(), brain, Knowledge::Offline, true);

        let err = f
            .orchestrator
            .generate_quiz_within("slow topic", Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "timeout");
        assert!(f.sessions.is_empty());
    }
}
