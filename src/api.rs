// src/api.rs
// HTTP SURFACE
// Request/response shapes and actix handlers for quiz generation and guessing.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{error, web, HttpRequest, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::error::QuizError;
use crate::knowledge::QuizQuestion;
use crate::matcher::{GuessMatcher, GuessResult};
use crate::orchestrator::{GeneratedQuiz, Quiz, QuizOrchestrator, QuizSource};

/// Topic used when the player asks for a surprise quiz.
pub const RANDOM_TOPIC: &str = "Pick a random quiz topic and list its items";

// Shared state for the server
pub struct AppState {
    pub orchestrator: Arc<QuizOrchestrator>,
    pub matcher: GuessMatcher,
    pub quiz_timeout: Duration,
}

impl AppState {
    pub fn new(orchestrator: QuizOrchestrator, quiz_timeout: Duration) -> Self {
        let matcher = GuessMatcher::new(orchestrator.sessions());
        Self {
            orchestrator: Arc::new(orchestrator),
            matcher,
            quiz_timeout,
        }
    }
}

// 1. Request formats
#[derive(Debug, Deserialize)]
pub struct GenerateQuizRequest {
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckGuessRequest {
    pub session_id: String,
    pub guess: String,
}

// 2. Response formats
#[derive(Debug, Serialize)]
#[serde(tag = "quiz_type", rename_all = "lowercase")]
pub enum QuizPayload {
    List { items: Vec<String> },
    Mcq { quiz: Vec<QuizQuestion> },
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub session_id: String,
    #[serde(flatten)]
    pub payload: QuizPayload,
    pub source: QuizSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_count: Option<usize>,
}

impl From<GeneratedQuiz> for QuizResponse {
    fn from(generated: GeneratedQuiz) -> Self {
        let payload = match generated.quiz {
            Quiz::List { items } => QuizPayload::List { items },
            Quiz::Mcq { questions } => QuizPayload::Mcq { quiz: questions },
        };
        Self {
            session_id: generated.session_id,
            payload,
            source: generated.source,
            requested_count: generated.requested_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub sessions: usize,
}

// 3. Errors
/// Client-facing error: generic message plus category. Details stay in the logs.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    category: &'static str,
    message: &'static str,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.category, self.message)
    }
}

impl From<QuizError> for ApiError {
    fn from(err: QuizError) -> Self {
        let status = match err {
            QuizError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            QuizError::GatewayTimeout { .. } | QuizError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            QuizError::Configuration(_) | QuizError::Upstream(_) | QuizError::AdapterUnavailable(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            error!(category = err.category(), error = %err, "request failed");
        } else {
            debug!(category = err.category(), error = %err, "rejected request");
        }

        Self {
            status,
            category: err.category(),
            message: err.public_message(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status).json(json!({
            "error": self.message,
            "category": self.category,
        }))
    }
}

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::from(QuizError::invalid_input(err.to_string())).into()
}

/// Registers every route plus the JSON extractor config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .route("/generate-quiz", web::post().to(generate_quiz))
        .route("/random-quiz", web::post().to(random_quiz))
        .route("/check-guess", web::post().to(check_guess))
        .route("/health", web::get().to(health));
}

// POST /generate-quiz
pub async fn generate_quiz(
    data: web::Data<AppState>,
    req: web::Json<GenerateQuizRequest>,
) -> Result<HttpResponse, ApiError> {
    let generated = data
        .orchestrator
        .generate_quiz_within(&req.topic, data.quiz_timeout)
        .await?;
    Ok(HttpResponse::Ok().json(QuizResponse::from(generated)))
}

// POST /random-quiz
pub async fn random_quiz(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let generated = data
        .orchestrator
        .generate_quiz_within(RANDOM_TOPIC, data.quiz_timeout)
        .await?;
    Ok(HttpResponse::Ok().json(QuizResponse::from(generated)))
}

// POST /check-guess
pub async fn check_guess(
    data: web::Data<AppState>,
    req: web::Json<CheckGuessRequest>,
) -> web::Json<GuessResult> {
    web::Json(data.matcher.check_guess(&req.session_id, &req.guess))
}

// GET /health
pub async fn health(data: web::Data<AppState>) -> web::Json<HealthResponse> {
    web::Json(HealthResponse {
        status: "ok",
        sessions: data.orchestrator.sessions().len(),
    })
}
