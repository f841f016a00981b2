//! Abstracción sobre Rig para la generación de respuestas con un modelo de
//! chat alojado en la inferencia de Hugging Face.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rig::completion::Prompt;
use tracing::debug;

use crate::config::AppConfig;

/// Instrucción de sistema fija del asistente.
pub const SYSTEM_PROMPT: &str = r#"
You are an IVF patient support assistant.
Answer ONLY using the provided context.
Do NOT diagnose or prescribe.
Recommend consulting a fertility specialist.
Answers should be straight to the question. Don't manipulate the answer.
For daily activity or lifestyle questions, prioritize patient education context over procedural IVF details.
Clearly give a user friendly answer, short and to the point.
"#;

/// Modelo de chat remoto: un mensaje de sistema y un mensaje de usuario.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Construye el mensaje de usuario: contexto recuperado + pregunta literal.
pub fn build_user_message(context: &str, question: &str) -> String {
    format!("Context:\n{context}\n\nQuestion:\n{question}\n")
}

/// Cliente de chat de Hugging Face con decodificación determinista.
pub struct HuggingFaceChat {
    client: rig::providers::huggingface::Client,
    model: String,
    temperature: f64,
    max_tokens: u64,
    timeout: Duration,
}

impl HuggingFaceChat {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = rig::providers::huggingface::Client::new(&cfg.hf_token);
        Ok(Self {
            client,
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_new_tokens,
            timeout: cfg.llm_timeout,
        })
    }
}

#[async_trait]
impl ChatModel for HuggingFaceChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        // Trait para client.agent(...)
        use rig::client::CompletionClient as _;

        let agent = self
            .client
            .agent(&self.model)
            .preamble(system)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build();

        debug!("Llamando a {} (max_tokens={})", self.model, self.max_tokens);
        let answer = tokio::time::timeout(self.timeout, agent.prompt(user))
            .await
            .map_err(|_| {
                anyhow!(
                    "El modelo {} no respondió en {} s",
                    self.model,
                    self.timeout.as_secs()
                )
            })??;

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_places_context_before_question() {
        let msg = build_user_message("chunk one\n\nchunk two", "Can I swim?");
        assert!(msg.starts_with("Context:\nchunk one\n\nchunk two"));
        assert!(msg.ends_with("Question:\nCan I swim?\n"));
    }

    #[test]
    fn system_prompt_forbids_diagnosis() {
        assert!(SYSTEM_PROMPT.contains("ONLY using the provided context"));
        assert!(SYSTEM_PROMPT.contains("Do NOT diagnose or prescribe"));
    }
}
