//! Carga y gestión de configuración de la aplicación (índice vectorial,
//! embeddings, generación y credenciales de Hugging Face).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

/// Configuración completa de la aplicación. Se lee una sola vez al arrancar.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub vector_db_path: PathBuf,
    pub history_path: PathBuf,
    pub server_addr: String,

    pub embedding_model: String,
    pub chat_model: String,
    /// Base del endpoint de embeddings; el chat usa la ruta por defecto de rig.
    pub embeddings_base_url: String,

    pub chunk_size: usize,
    pub chunk_overlap: usize,

    pub top_k: usize,
    pub answer_top_k: usize,
    pub min_score: Option<f32>,

    pub temperature: f64,
    pub max_new_tokens: u64,

    pub llm_timeout: Duration,
    pub request_timeout: Duration,

    pub hf_token: String,
}

impl AppConfig {
    /// Carga la configuración desde variables de entorno (usando .env si existe).
    pub fn from_env() -> Result<Self> {
        let hf_token = env::var("HUGGINGFACEHUB_API_TOKEN")
            .map_err(|_| anyhow!("Falta HUGGINGFACEHUB_API_TOKEN en el entorno"))?;
        if hf_token.trim().is_empty() {
            return Err(anyhow!("HUGGINGFACEHUB_API_TOKEN está vacío"));
        }

        let min_score = match env::var("RAG_MIN_SCORE") {
            Ok(raw) => Some(parse_value::<f32>("RAG_MIN_SCORE", &raw)?),
            Err(_) => None,
        };

        Ok(Self {
            data_dir: PathBuf::from(var_or("RAG_DATA_DIR", "data")),
            vector_db_path: PathBuf::from(var_or("RAG_VECTOR_DB_PATH", "vectorstore")),
            history_path: PathBuf::from(var_or("RAG_HISTORY_PATH", "history.jsonl")),
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:3322"),

            embedding_model: var_or("RAG_EMBEDDING_MODEL", "BAAI/bge-base-en-v1.5"),
            chat_model: var_or("RAG_CHAT_MODEL", "mistralai/Mistral-7B-Instruct-v0.2"),
            embeddings_base_url: var_or(
                "RAG_EMBEDDINGS_URL",
                "https://router.huggingface.co/hf-inference",
            ),

            chunk_size: parsed_or("RAG_CHUNK_SIZE", 500)?,
            chunk_overlap: parsed_or("RAG_CHUNK_OVERLAP", 100)?,

            top_k: parsed_or("RAG_TOP_K", 3)?,
            answer_top_k: parsed_or("RAG_ANSWER_TOP_K", 4)?,
            min_score,

            temperature: parsed_or("RAG_TEMPERATURE", 0.0)?,
            max_new_tokens: parsed_or("RAG_MAX_NEW_TOKENS", 300)?,

            llm_timeout: Duration::from_secs(parsed_or("RAG_LLM_TIMEOUT_SECS", 120)?),
            request_timeout: Duration::from_secs(parsed_or("RAG_REQUEST_TIMEOUT_SECS", 120)?),

            hf_token,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => parse_value(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| anyhow!("Valor inválido para {key}: '{raw}'"))
}

#[cfg(test)]
impl AppConfig {
    /// Configuración con los valores por defecto, sin tocar el entorno.
    pub fn for_tests(vector_db_path: PathBuf) -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            history_path: vector_db_path.join("history.jsonl"),
            vector_db_path,
            server_addr: "127.0.0.1:0".to_string(),
            embedding_model: "BAAI/bge-base-en-v1.5".to_string(),
            chat_model: "mistralai/Mistral-7B-Instruct-v0.2".to_string(),
            embeddings_base_url: "http://localhost".to_string(),
            chunk_size: 500,
            chunk_overlap: 100,
            top_k: 3,
            answer_top_k: 4,
            min_score: None,
            temperature: 0.0,
            max_new_tokens: 300,
            llm_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(120),
            hf_token: "test-token".to_string(),
        }
    }
}
