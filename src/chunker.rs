//! Troceado de documentos limpios en chunks solapados.
//!
//! La elección de fronteras (párrafo, frase, palabra y, en último caso,
//! carácter) la resuelve `text-splitter`; aquí sólo se fija el contrato de
//! tamaño y solapamiento y se propagan los metadatos del documento.

use anyhow::{Context, Result};
use text_splitter::{ChunkConfig, TextSplitter};

use crate::models::{Chunk, Document};

/// Divide cada documento en chunks de como máximo `chunk_size` caracteres,
/// con hasta `chunk_overlap` caracteres compartidos entre chunks consecutivos
/// del mismo documento. Los documentos vacíos no aportan ningún chunk.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Chunk>> {
    let config = ChunkConfig::new(chunk_size)
        .with_overlap(chunk_overlap)
        .with_context(|| {
            format!("Configuración de troceado inválida (tamaño {chunk_size}, solape {chunk_overlap})")
        })?;
    let splitter = TextSplitter::new(config);

    let mut chunks = Vec::new();
    for doc in documents {
        if doc.text.trim().is_empty() {
            continue;
        }
        chunks.extend(splitter.chunks(&doc.text).map(|text| Chunk {
            text: text.to_string(),
            source: doc.source.clone(),
            page: doc.page,
        }));
    }
    Ok(chunks)
}
