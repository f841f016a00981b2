// Módulos de la aplicación
mod api;
mod app_state;
mod chunker;
mod cleaner;
mod config;
mod embeddings;
mod history;
mod ingest;
mod llm;
mod models;
mod rag;
mod topics;
mod vector_store;

#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    app_state::AppState,
    config::AppConfig,
    embeddings::HuggingFaceEmbedder,
    history::{DateRange, QueryHistory, QueryRecord},
    rag::RagContext,
    topics::classify_topic,
    vector_store::VectorIndex,
};

/// Asistente RAG para pacientes de FIV: ingesta de PDF y preguntas sobre ellos.
#[derive(Parser)]
#[command(name = "ivf-rag", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Construye el índice vectorial a partir de un directorio de PDF.
    Ingest {
        /// Directorio de entrada (por defecto RAG_DATA_DIR).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Responde a una pregunta usando el índice.
    Ask { question: String },
    /// Muestra los pasajes recuperados para una consulta, sin llamar al LLM.
    Search { query: String },
    /// Levanta la API HTTP.
    Serve,
    /// Estadísticas del índice persistido.
    Stats,
    /// Recuento de preguntas por tema a partir del historial.
    Topics {
        /// Primer día incluido (AAAA-MM-DD).
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Último día incluido (AAAA-MM-DD).
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Cargar .env e inicializar logging
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // 2. Cargar configuración (falla si falta la credencial)
    let cfg = AppConfig::from_env()?;

    match cli.command {
        Command::Ingest { data_dir } => {
            let data_dir = data_dir.unwrap_or_else(|| cfg.data_dir.clone());
            let embedder = HuggingFaceEmbedder::from_config(&cfg)?;
            let summary = ingest::run_ingestion(&cfg, &embedder, &data_dir).await?;
            info!("✅ Índice vectorial construido. {summary}");
        }
        Command::Ask { question } => {
            let rag = RagContext::initialize(&cfg)?;
            let answer = rag.generate_answer(&question).await?;
            let topic = classify_topic(&question);
            QueryHistory::new(&cfg.history_path).append(&QueryRecord::new(&question, &answer, topic))?;
            println!("{}", serde_json::to_string_pretty(&answer)?);
        }
        Command::Search { query } => {
            let rag = RagContext::initialize(&cfg)?;
            let results = rag.retrieve(&query).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Serve => serve(cfg).await?,
        Command::Stats => {
            let index = VectorIndex::load(&cfg.vector_db_path)?;
            print!("{}", index.stats());
        }
        Command::Topics { from, to } => {
            let analytics =
                QueryHistory::new(&cfg.history_path).analytics(DateRange { from, to })?;
            print!("{analytics}");
        }
    }

    Ok(())
}

async fn serve(cfg: AppConfig) -> Result<()> {
    let rag = RagContext::initialize(&cfg)?;

    // Crear canal para la señal de apagado.
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let app_state = AppState {
        rag: Arc::new(rag),
        history: Arc::new(QueryHistory::new(&cfg.history_path)),
        shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    let app = api::create_router(app_state).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let listener = tokio::net::TcpListener::bind(&cfg.server_addr).await?;
    info!("🚀 Servidor escuchando en http://{}", cfg.server_addr);

    // Configurar el apagado ordenado.
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_rx.await.ok();
            info!("Señal de apagado recibida, iniciando cierre del servidor.");
        })
        .await?;

    info!("✅ Servidor cerrado correctamente.");
    Ok(())
}
