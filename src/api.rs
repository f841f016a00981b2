use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    app_state::AppState,
    history::{DateRange, QueryRecord, TopicAnalytics},
    topics::{classify_topic, SUGGESTED_QUESTIONS},
    vector_store::IndexStats,
};

// --- Payloads y Respuestas de la API ---

#[derive(Deserialize)]
pub struct AskPayload {
    question: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    answer: String,
    sources: Vec<String>,
    topic: String,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

// --- Router ---

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/ask", post(ask_handler))
        .route("/api/status", get(status_handler))
        .route("/api/analytics", get(analytics_handler))
        .route("/api/suggestions", get(suggestions_handler))
        .route("/api/shutdown", post(shutdown_handler))
        .with_state(app_state)
}

// --- Handlers ---

#[axum::debug_handler]
async fn ask_handler(
    State(state): State<AppState>,
    Json(payload): Json<AskPayload>,
) -> Result<Json<AskResponse>, ApiError> {
    let question = payload.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "La pregunta no puede estar vacía."})),
        ));
    }

    let topic = classify_topic(question);
    let answer = state.rag.generate_answer(question).await.map_err(|e| {
        error!("Error en la consulta RAG: {e:#}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Error al procesar la consulta RAG: {e}")})),
        )
    })?;

    // El historial no condiciona la respuesta.
    if let Err(e) = state.history.append(&QueryRecord::new(question, &answer, topic)) {
        warn!("No se pudo registrar la consulta en el historial: {e:#}");
    }

    Ok(Json(AskResponse {
        answer: answer.answer,
        sources: answer.sources,
        topic: topic.to_string(),
    }))
}

#[axum::debug_handler]
async fn status_handler(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.rag.index().stats())
}

#[axum::debug_handler]
async fn analytics_handler(
    State(state): State<AppState>,
    Query(range): Query<DateRange>,
) -> Result<Json<TopicAnalytics>, ApiError> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "El rango de fechas es inválido: 'from' es posterior a 'to'."})),
            ));
        }
    }
    state.history.analytics(range).map(Json).map_err(|e| {
        error!("Error leyendo el historial: {e:#}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": format!("Error leyendo el historial: {e}")})),
        )
    })
}

async fn suggestions_handler() -> Json<&'static [&'static str]> {
    Json(SUGGESTED_QUESTIONS)
}

#[axum::debug_handler]
async fn shutdown_handler(State(state): State<AppState>) -> impl IntoResponse {
    info!("Petición de apagado recibida.");
    if let Some(sender) = state.shutdown_sender.lock().unwrap().take() {
        let _ = sender.send(());
    }
    StatusCode::OK
}
