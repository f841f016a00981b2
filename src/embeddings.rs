//! Cliente de embeddings sobre el endpoint `feature-extraction` de la
//! inferencia de Hugging Face.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;

/// Textos por petición al endpoint de embeddings.
const EMBED_BATCH_SIZE: usize = 32;

/// Modelo de embeddings usado tanto en la ingesta como en la consulta.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identificador del modelo (se guarda en la cabecera del índice).
    fn model_name(&self) -> &str;

    /// Calcula un vector normalizado por cada texto, en el mismo orden.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_texts(&[query.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("No se pudo generar embedding de la consulta"))
    }
}

#[derive(Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
    normalize: bool,
}

/// Embeddings remotos de un modelo tipo `BAAI/bge-base-en-v1.5`.
pub struct HuggingFaceEmbedder {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
}

impl HuggingFaceEmbedder {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout)
            .build()
            .context("No se pudo construir el cliente HTTP de embeddings")?;
        let endpoint = format!(
            "{}/models/{}/pipeline/feature-extraction",
            cfg.embeddings_base_url.trim_end_matches('/'),
            cfg.embedding_model
        );
        Ok(Self {
            http,
            endpoint,
            model: cfg.embedding_model.clone(),
            token: cfg.hf_token.clone(),
        })
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            debug!("Solicitando {} embeddings a {}", batch.len(), self.endpoint);
            let response = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .json(&FeatureExtractionRequest {
                    inputs: batch,
                    normalize: true,
                })
                .send()
                .await
                .with_context(|| format!("Error llamando a {}", self.endpoint))?
                .error_for_status()
                .context("El endpoint de embeddings devolvió un error")?;

            let embedded: Vec<Vec<f32>> = response
                .json()
                .await
                .context("Respuesta de embeddings con formato inesperado")?;

            if embedded.len() != batch.len() {
                return Err(anyhow!(
                    "Número de embeddings ({}) distinto al número de textos ({})",
                    embedded.len(),
                    batch.len()
                ));
            }
            vectors.extend(embedded);
        }

        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn endpoint_is_built_from_embeddings_base_url() {
        let mut cfg = AppConfig::for_tests(PathBuf::from("unused"));
        cfg.embeddings_base_url = "http://embeddings.local/hf/".to_string();

        let embedder = HuggingFaceEmbedder::from_config(&cfg).unwrap();

        assert_eq!(
            embedder.endpoint,
            "http://embeddings.local/hf/models/BAAI/bge-base-en-v1.5/pipeline/feature-extraction"
        );
        assert_eq!(embedder.model_name(), "BAAI/bge-base-en-v1.5");
    }
}
