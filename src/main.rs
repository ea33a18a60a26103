// src/main.rs
// GUESS.AI CORE - API SERVER
// Serves the quiz front ends via REST API (Actix-Web)

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use guessai_core::api::{self, AppState};
use guessai_core::brain::OpenAiBrain;
use guessai_core::config::AppConfig;
use guessai_core::generator::ListGenerator;
use guessai_core::knowledge::FactStore;
use guessai_core::orchestrator::QuizOrchestrator;
use guessai_core::scrape::ListScraper;
use guessai_core::session::MemorySessionStore;
use guessai_core::verify::Verifier;
use guessai_core::wiki::WikiClient;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    // 1. Curated topics (bundled seed + optional extra file)
    let mut facts = FactStore::seeded()?;
    if let Some(path) = &config.facts_path {
        let loaded = facts.load_file(path)?;
        info!(path = %path.display(), loaded, "loaded extra curated topics");
    }
    info!(topics = facts.len(), "curated store ready");

    // 2. Remote adapters. The API key is only read on first generation.
    let wiki = Arc::new(WikiClient::new(&config.wiki)?);
    let brain = Arc::new(OpenAiBrain::new(config.model.clone())?);

    // 3. Cascade + session store
    let orchestrator = QuizOrchestrator::new(
        Arc::new(facts),
        ListScraper::new(wiki.clone()),
        ListGenerator::new(brain),
        Verifier::new(wiki, config.verify_concurrency),
        Arc::new(MemorySessionStore::new(&config.sessions)),
        config.pass_through_unverified,
    );
    let app_state = web::Data::new(AppState::new(orchestrator, config.quiz_timeout));

    info!(bind = %config.bind_addr, model = %config.model.model, "guess.ai server starting");

    // 4. Start HTTP Server
    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            .configure(api::configure)
    })
    .bind(config.bind_addr.as_str())
    .with_context(|| format!("failed to bind {}", config.bind_addr))?
    .run()
    .await
    .context("http server stopped unexpectedly")
}
