//! Índice vectorial persistido en disco como JSON.
//!
//! API pública:
//!   - `VectorIndex::build(model, chunks, embeddings)`
//!   - `VectorIndex::save(&Path)` / `VectorIndex::load(&Path)`
//!   - `VectorIndex::search(&[f32], top_k, min_score)`.
//!
//! El índice se construye una vez durante la ingesta y se carga en modo sólo
//! lectura al consultar; no hay actualizaciones incrementales.

use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{Chunk, ScoredChunk};

/// Chunk almacenado con su vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    pub source: String,
    pub page: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndex {
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<IndexedChunk>,
}

/// Resumen del contenido del índice.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub embedding_model: String,
    pub dimensions: usize,
    pub created_at: DateTime<Utc>,
    pub total_chunks: usize,
    pub chunks_per_source: BTreeMap<String, usize>,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Índice: {} chunks de {} ficheros (modelo {}, {} dimensiones, creado {}).",
            self.total_chunks,
            self.chunks_per_source.len(),
            self.embedding_model,
            self.dimensions,
            self.created_at.to_rfc3339()
        )?;
        for (source, count) in &self.chunks_per_source {
            writeln!(f, "  - {source}: {count} chunks")?;
        }
        Ok(())
    }
}

impl VectorIndex {
    /// Crea un índice vacío para el modelo dado.
    pub fn empty(embedding_model: &str) -> Self {
        Self {
            embedding_model: embedding_model.to_string(),
            dimensions: 0,
            created_at: Utc::now(),
            chunks: Vec::new(),
        }
    }

    /// Empareja cada chunk con su embedding. Todos los vectores deben tener
    /// la misma dimensión y todos los chunks un fichero de origen.
    pub fn build(embedding_model: &str, chunks: Vec<Chunk>, embeddings: Vec<Vec<f32>>) -> Result<Self> {
        if chunks.len() != embeddings.len() {
            return Err(anyhow!(
                "Número de embeddings ({}) distinto al número de chunks ({})",
                embeddings.len(),
                chunks.len()
            ));
        }

        let mut index = Self::empty(embedding_model);
        index.dimensions = embeddings.first().map(Vec::len).unwrap_or(0);

        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            if chunk.source.trim().is_empty() {
                return Err(anyhow!("Chunk sin fichero de origen: {:.40}", chunk.text));
            }
            if embedding.len() != index.dimensions {
                return Err(anyhow!(
                    "Dimensión de embedding inconsistente: {} en lugar de {}",
                    embedding.len(),
                    index.dimensions
                ));
            }
            index.chunks.push(IndexedChunk {
                id: Uuid::new_v4().to_string(),
                text: chunk.text,
                source: chunk.source,
                page: chunk.page,
                embedding,
            });
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Escribe el índice en `dir/index.json`, creando el directorio si hace falta.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("No se pudo crear el directorio {}", dir.display()))?;
        let path = dir.join("index.json");
        let json = serde_json::to_vec(self)?;
        fs::write(&path, json)
            .with_context(|| format!("No se pudo escribir el índice en {}", path.display()))?;
        info!("Índice guardado en {} ({} chunks).", path.display(), self.len());
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("index.json");
        let raw = fs::read(&path)
            .with_context(|| format!("No se pudo leer el índice {}", path.display()))?;
        let index: Self = serde_json::from_slice(&raw)
            .with_context(|| format!("Índice corrupto en {}", path.display()))?;
        info!("Índice cargado desde {} ({} chunks).", path.display(), index.len());
        Ok(index)
    }

    /// Devuelve los `top_k` chunks más similares a `query` por similitud
    /// coseno, de mayor a menor. Un índice vacío devuelve una lista vacía;
    /// una consulta con otra dimensión es un error.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimensions {
            return Err(anyhow!(
                "La consulta tiene {} dimensiones y el índice {}",
                query.len(),
                self.dimensions
            ));
        }

        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query, &chunk.embedding), chunk))
            .filter(|(score, _)| min_score.map_or(true, |min| *score >= min))
            .collect();

        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, chunk)| ScoredChunk {
                score,
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                page: chunk.page,
            })
            .collect())
    }

    pub fn stats(&self) -> IndexStats {
        let mut chunks_per_source = BTreeMap::new();
        for chunk in &self.chunks {
            *chunks_per_source.entry(chunk.source.clone()).or_insert(0) += 1;
        }
        IndexStats {
            embedding_model: self.embedding_model.clone(),
            dimensions: self.dimensions,
            created_at: self.created_at,
            total_chunks: self.chunks.len(),
            chunks_per_source,
        }
    }
}

/// Similitud coseno; 0.0 si las dimensiones no coinciden o algún vector es nulo.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
