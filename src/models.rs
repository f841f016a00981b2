//! Modelos de dominio: páginas de PDF, chunks y respuestas del asistente.

use serde::{Deserialize, Serialize};

/// Texto de una página de un PDF, tal como lo devuelve el cargador.
/// La limpieza lo modifica in situ antes de trocearlo.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub source: String,
    pub page: usize,
}

/// Trozo contiguo del texto limpio de un documento.
/// Hereda el fichero de origen y la página de su documento.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    pub page: usize,
}

/// Respuesta del punto de entrada de consulta: `{ answer, sources }`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Pasaje recuperado del índice junto con su similitud con la consulta.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub score: f32,
    pub text: String,
    pub source: String,
    pub page: usize,
}
