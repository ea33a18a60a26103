// src/lib.rs
// GUESS.AI CORE
// Quiz generation cascade (curated facts, list scraping, generative
// fallback), verification, and guess matching.

pub mod api;
pub mod brain;
pub mod config;
pub mod error;
pub mod generator;
pub mod knowledge;
pub mod matcher;
pub mod normalizer;
pub mod orchestrator;
pub mod parser;
pub mod scrape;
pub mod session;
pub mod verify;
pub mod wiki;

pub use error::{QuizError, Result};
