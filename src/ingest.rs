//! Ingesta de un directorio de PDF: extracción de texto por página,
//! limpieza, troceado, embeddings y persistencia del índice vectorial.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    chunker,
    cleaner::clean_pdf_text,
    config::AppConfig,
    embeddings::Embedder,
    models::Document,
    vector_store::VectorIndex,
};

/// Resumen de los resultados de una operación de ingesta.
#[derive(Debug, Default)]
pub struct IngestionSummary {
    pub files_ingested: usize,
    pub pages_loaded: usize,
    pub empty_pages: usize,
    pub chunks_created: usize,
}

/// Implementa cómo se mostrará el resumen como texto.
impl std::fmt::Display for IngestionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Resumen: {} PDF ingeridos, {} páginas ({} sin texto útil), {} chunks creados.",
            self.files_ingested, self.pages_loaded, self.empty_pages, self.chunks_created
        )
    }
}

/// Ejecuta la ingesta completa de `data_dir` y escribe el índice en
/// `cfg.vector_db_path`. Cualquier fallo interrumpe la ingesta.
pub async fn run_ingestion(
    cfg: &AppConfig,
    embedder: &dyn Embedder,
    data_dir: &Path,
) -> Result<IngestionSummary> {
    let pdfs = list_pdf_files(data_dir)?;
    info!("{} ficheros PDF encontrados en {}", pdfs.len(), data_dir.display());

    let mut documents = Vec::new();
    for path in &pdfs {
        let pages = load_pdf_pages(path)?;
        info!("Cargado {} ({} páginas)", path.display(), pages.len());
        documents.extend(pages);
    }

    let (index, mut summary) =
        build_index(documents, embedder, cfg.chunk_size, cfg.chunk_overlap).await?;
    summary.files_ingested = pdfs.len();

    index.save(&cfg.vector_db_path)?;
    Ok(summary)
}

/// Limpia, trocea y embebe los documentos, devolviendo el índice en memoria.
pub async fn build_index(
    mut documents: Vec<Document>,
    embedder: &dyn Embedder,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<(VectorIndex, IngestionSummary)> {
    let mut summary = IngestionSummary {
        pages_loaded: documents.len(),
        ..Default::default()
    };

    for doc in documents.iter_mut() {
        doc.text = clean_pdf_text(&doc.text);
        if doc.text.is_empty() {
            summary.empty_pages += 1;
        }
    }

    let chunks = chunker::split_documents(&documents, chunk_size, chunk_overlap)?;
    drop(documents);
    summary.chunks_created = chunks.len();

    if chunks.is_empty() {
        warn!("No se ha generado ningún chunk: el índice quedará vacío.");
        return Ok((VectorIndex::empty(embedder.model_name()), summary));
    }

    info!("Calculando embeddings de {} chunks con {}...", chunks.len(), embedder.model_name());
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = embedder.embed_texts(&texts).await?;

    let index = VectorIndex::build(embedder.model_name(), chunks, embeddings)?;
    Ok((index, summary))
}

/// Ficheros `.pdf` (sin distinguir mayúsculas) del nivel superior de `dir`,
/// en orden alfabético.
pub fn list_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(anyhow!("La ruta no es un directorio: {}", dir.display()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Error leyendo {}", dir.display()))?;
        let is_pdf = entry
            .path()
            .extension()
            .and_then(std::ffi::OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if entry.file_type().is_file() && is_pdf {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Extrae el texto de cada página de un PDF como un `Document`.
pub fn load_pdf_pages(path: &Path) -> Result<Vec<Document>> {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("Ruta sin nombre de fichero: {}", path.display()))?;

    let pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| anyhow!("No se pudo extraer texto del PDF {}: {e}", path.display()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(idx, text)| Document {
            text,
            source: filename.clone(),
            page: idx + 1,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::LetterEmbedder;
    use std::fs;

    fn page(text: &str, source: &str, page: usize) -> Document {
        Document {
            text: text.to_string(),
            source: source.to_string(),
            page,
        }
    }

    #[test]
    fn lists_only_top_level_pdfs_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.pdf"), b"").unwrap();
        fs::write(dir.path().join("A.PDF"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("c.pdf"), b"").unwrap();

        let names: Vec<String> = list_pdf_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["A.PDF", "b.pdf"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_pdf_files(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn unreadable_pdf_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"not a pdf").unwrap();
        assert!(load_pdf_pages(&path).is_err());
    }

    #[tokio::test]
    async fn build_index_cleans_chunks_and_embeds() {
        let embedder = LetterEmbedder::default();
        let docs = vec![
            page("Rest (Smith & Jones, 2001) after   transfer [3].", "care.pdf", 1),
            page("References\nSmith, J. 2001.", "care.pdf", 2),
            page("Take progesterone daily.", "meds.pdf", 1),
        ];

        let (index, summary) = build_index(docs, &embedder, 500, 100).await.unwrap();

        assert_eq!(summary.pages_loaded, 3);
        assert_eq!(summary.empty_pages, 1);
        assert_eq!(summary.chunks_created, 2);
        assert_eq!(embedder.calls(), 1);

        assert_eq!(index.len(), 2);
        assert_eq!(index.dimensions, 26);
        assert_eq!(index.embedding_model, "test-letters");
        assert_eq!(index.chunks[0].text, "Rest after transfer .");
        assert!(index.chunks.iter().all(|c| !c.source.is_empty()));
    }

    #[tokio::test]
    async fn no_text_means_empty_index_without_embedding_calls() {
        let embedder = LetterEmbedder::default();
        let docs = vec![page("   ", "scan.pdf", 1)];

        let (index, summary) = build_index(docs, &embedder, 500, 100).await.unwrap();

        assert!(index.is_empty());
        assert_eq!(summary.chunks_created, 0);
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn run_ingestion_on_empty_directory_persists_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        let cfg = AppConfig::for_tests(dir.path().join("vs"));

        let summary = run_ingestion(&cfg, &LetterEmbedder::default(), &data).await.unwrap();

        assert_eq!(summary.files_ingested, 0);
        assert!(VectorIndex::load(&cfg.vector_db_path).unwrap().is_empty());
    }
}
