//! Consulta RAG sobre el índice vectorial local.
//!
//! Flujo:
//!   1. Embedding de la pregunta.
//!   2. Búsqueda de los chunks más similares en el índice.
//!   3. Sin chunks no se llama al modelo: se devuelve la respuesta de rechazo.
//!   4. Con chunks, el LLM responde usando sólo ese contexto.
//!   5. Se devuelven la respuesta y los ficheros de origen sin duplicados.

use std::{collections::BTreeSet, sync::Arc};

use anyhow::{anyhow, Result};
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    embeddings::{Embedder, HuggingFaceEmbedder},
    llm::{build_user_message, ChatModel, HuggingFaceChat, SYSTEM_PROMPT},
    models::{RagAnswer, ScoredChunk},
    vector_store::VectorIndex,
};

/// Respuesta fija cuando la recuperación no encuentra contexto.
pub const NO_CONTEXT_ANSWER: &str = "I don’t have enough information to answer this safely.";

/// Estado de sólo lectura necesario para responder preguntas.
/// Se construye una vez y se comparte entre consultas.
pub struct RagContext {
    index: VectorIndex,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn ChatModel>,
    top_k: usize,
    answer_top_k: usize,
    min_score: Option<f32>,
}

impl RagContext {
    /// Carga el índice persistido y prepara los clientes remotos.
    pub fn initialize(cfg: &AppConfig) -> Result<Self> {
        info!("🔹 Cargando índice vectorial desde {}...", cfg.vector_db_path.display());
        let index = VectorIndex::load(&cfg.vector_db_path)?;

        info!("🔹 Preparando embeddings ({})...", cfg.embedding_model);
        let embedder = Arc::new(HuggingFaceEmbedder::from_config(cfg)?);

        info!("🔹 Preparando modelo de chat ({})...", cfg.chat_model);
        let llm = Arc::new(HuggingFaceChat::from_config(cfg)?);

        Self::new(cfg, index, embedder, llm)
    }

    /// Monta el contexto con componentes ya construidos. El índice debe
    /// haberse generado con el mismo modelo de embeddings que se usa al consultar.
    pub fn new(
        cfg: &AppConfig,
        index: VectorIndex,
        embedder: Arc<dyn Embedder>,
        llm: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        if !index.is_empty() && index.embedding_model != embedder.model_name() {
            return Err(anyhow!(
                "El índice se generó con '{}' pero la consulta usa '{}'. Repite la ingesta.",
                index.embedding_model,
                embedder.model_name()
            ));
        }

        Ok(Self {
            index,
            embedder,
            llm,
            top_k: cfg.top_k,
            answer_top_k: cfg.answer_top_k,
            min_score: cfg.min_score,
        })
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Recuperación con la amplitud configurada (`top_k`).
    pub async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        self.retrieve_k(query, self.top_k).await
    }

    async fn retrieve_k(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if self.index.is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self.embedder.embed_query(query).await?;
        self.index.search(&query_vec, k, self.min_score)
    }

    /// Punto de entrada de consulta: `{ answer, sources }`.
    pub async fn generate_answer(&self, user_query: &str) -> Result<RagAnswer> {
        let docs = self.retrieve_k(user_query, self.answer_top_k).await?;

        if docs.is_empty() {
            info!("Sin contexto relevante; no se invoca al modelo.");
            return Ok(RagAnswer {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        for doc in &docs {
            debug!("Contexto: {} p.{} (score {:.3})", doc.source, doc.page, doc.score);
        }

        let context = docs
            .iter()
            .map(|d| d.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources: Vec<String> = docs
            .iter()
            .map(|d| d.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let response = self
            .llm
            .complete(SYSTEM_PROMPT, &build_user_message(&context, user_query))
            .await?;

        Ok(RagAnswer {
            answer: response.trim().to_string(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;
    use crate::test_support::{LetterEmbedder, ScriptedChat};
    use std::path::PathBuf;

    fn cfg() -> AppConfig {
        AppConfig::for_tests(PathBuf::from("unused"))
    }

    fn index_of(chunks: &[(&str, &str)]) -> VectorIndex {
        let chunks: Vec<Chunk> = chunks
            .iter()
            .map(|(text, source)| Chunk {
                text: text.to_string(),
                source: source.to_string(),
                page: 1,
            })
            .collect();
        let vectors = chunks.iter().map(|c| LetterEmbedder::vector(&c.text)).collect();
        VectorIndex::build("test-letters", chunks, vectors).unwrap()
    }

    #[tokio::test]
    async fn empty_index_refuses_without_calling_the_model() {
        let embedder = Arc::new(LetterEmbedder::default());
        let chat = Arc::new(ScriptedChat::replying("should not be used"));
        let ctx = RagContext::new(&cfg(), VectorIndex::empty("test-letters"), embedder.clone(), chat.clone())
            .unwrap();

        assert!(ctx.retrieve("Can I exercise?").await.unwrap().is_empty());

        let answer = ctx.generate_answer("Can I exercise?").await.unwrap();
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert!(answer.sources.is_empty());
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn threshold_with_no_match_also_refuses() {
        let mut config = cfg();
        config.min_score = Some(1.1);
        let chat = Arc::new(ScriptedChat::replying("unused"));
        let ctx = RagContext::new(
            &config,
            index_of(&[("walking is fine", "care.pdf")]),
            Arc::new(LetterEmbedder::default()),
            chat.clone(),
        )
        .unwrap();

        let answer = ctx.generate_answer("walking").await.unwrap();
        assert_eq!(answer.answer, NO_CONTEXT_ANSWER);
        assert_eq!(chat.calls(), 0);
    }

    #[tokio::test]
    async fn answer_is_trimmed_and_sources_are_a_set() {
        let chat = Arc::new(ScriptedChat::replying("\n  Gentle walking is fine.  \n"));
        let index = index_of(&[
            ("walking is fine after transfer", "care.pdf"),
            ("light walking helps circulation", "care.pdf"),
            ("walking daily during stimulation", "lifestyle.pdf"),
            ("progesterone injections are daily", "meds.pdf"),
            ("avoid heavy lifting", "care.pdf"),
        ]);
        let ctx = RagContext::new(&cfg(), index, Arc::new(LetterEmbedder::default()), chat.clone())
            .unwrap();

        let answer = ctx.generate_answer("Is walking fine?").await.unwrap();

        assert_eq!(answer.answer, "Gentle walking is fine.");
        assert_eq!(chat.calls(), 1);
        assert!(!answer.sources.is_empty());
        let unique: BTreeSet<_> = answer.sources.iter().collect();
        assert_eq!(unique.len(), answer.sources.len());

        let sent = chat.last_user_message.lock().unwrap().clone().unwrap();
        assert!(sent.starts_with("Context:\n"));
        assert!(sent.contains("Question:\nIs walking fine?"));
    }

    #[tokio::test]
    async fn answer_path_uses_wider_k_than_configured_retrieval() {
        let chat = Arc::new(ScriptedChat::replying("ok"));
        let index = index_of(&[
            ("alpha", "a.pdf"),
            ("beta", "b.pdf"),
            ("gamma", "c.pdf"),
            ("delta", "d.pdf"),
            ("epsilon", "e.pdf"),
        ]);
        let ctx = RagContext::new(&cfg(), index, Arc::new(LetterEmbedder::default()), chat.clone())
            .unwrap();

        assert_eq!(ctx.retrieve("alpha").await.unwrap().len(), 3);
        let answer = ctx.generate_answer("alpha").await.unwrap();
        assert_eq!(answer.sources.len(), 4);
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let ctx = RagContext::new(
            &cfg(),
            index_of(&[("rest after transfer", "care.pdf")]),
            Arc::new(LetterEmbedder::default()),
            Arc::new(ScriptedChat::failing()),
        )
        .unwrap();

        assert!(ctx.generate_answer("rest?").await.is_err());
    }

    /// Embedder con el mismo nombre de modelo pero otra dimensión.
    struct ShortEmbedder;

    #[async_trait::async_trait]
    impl Embedder for ShortEmbedder {
        fn model_name(&self) -> &str {
            "test-letters"
        }

        async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn query_dimension_mismatch_fails_before_calling_the_model() {
        let chat = Arc::new(ScriptedChat::replying("unused"));
        let ctx = RagContext::new(
            &cfg(),
            index_of(&[("rest after transfer", "care.pdf")]),
            Arc::new(ShortEmbedder),
            chat.clone(),
        )
        .unwrap();

        assert!(ctx.generate_answer("rest?").await.is_err());
        assert_eq!(chat.calls(), 0);
    }

    #[test]
    fn mismatched_embedding_model_is_rejected() {
        let mut index = index_of(&[("rest", "care.pdf")]);
        index.embedding_model = "other-model".to_string();
        let result = RagContext::new(
            &cfg(),
            index,
            Arc::new(LetterEmbedder::default()),
            Arc::new(ScriptedChat::replying("ok")),
        );
        assert!(result.is_err());
    }
}
