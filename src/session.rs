// src/session.rs
// In-memory quiz sessions: id -> answer list. Written once by the
// orchestrator, read by the guess matcher. Bounded by capacity and age.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::config::SessionConfig;

#[derive(Debug, Clone, Serialize)]
pub struct QuizSession {
    pub session_id: String,
    pub items: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl QuizSession {
    fn age(&self) -> Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }
}

pub trait SessionStore: Send + Sync {
    fn put(&self, session_id: String, items: Vec<String>);
    fn get(&self, session_id: &str) -> Option<Arc<QuizSession>>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    session: Arc<QuizSession>,
    seq: u64,
}

pub struct MemorySessionStore {
    sessions: DashMap<String, Entry>,
    /// Insertion order, oldest at the front. Also serialises capacity checks.
    order: Mutex<VecDeque<(String, u64)>>,
    next_seq: AtomicU64,
    max_entries: usize,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            next_seq: AtomicU64::new(0),
            max_entries: config.max_entries.max(1),
            ttl: config.ttl,
        }
    }

    fn is_live(&self, session_id: &str, seq: u64) -> bool {
        self.sessions
            .get(session_id)
            .map(|entry| entry.seq == seq && entry.session.age() <= self.ttl)
            .unwrap_or(false)
    }

    /// Drops stale queue heads, then evicts oldest-first until one slot is free.
    fn make_room(&self, order: &mut VecDeque<(String, u64)>) {
        while let Some((session_id, seq)) = order.front().cloned() {
            if self.is_live(&session_id, seq) && self.sessions.len() < self.max_entries {
                break;
            }
            order.pop_front();
            if self
                .sessions
                .remove_if(&session_id, |_, entry| entry.seq == seq)
                .is_some()
            {
                debug!(session_id = %session_id, "evicted session");
            }
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn put(&self, session_id: String, items: Vec<String>) {
        let mut order = self.order.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.make_room(&mut order);

        let session = Arc::new(QuizSession {
            session_id: session_id.clone(),
            items,
            created_at: Utc::now(),
        });
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.sessions.insert(session_id.clone(), Entry { session, seq });
        order.push_back((session_id, seq));
    }

    fn get(&self, session_id: &str) -> Option<Arc<QuizSession>> {
        let session = self.sessions.get(session_id)?.session.clone();
        if session.age() > self.ttl {
            self.sessions.remove(session_id);
            return None;
        }
        Some(session)
    }

    fn len(&self) -> usize {
        self.sessions.len()
    }
}
