//! Answer generation over assembled item blocks

use super::{ChatMessage, LLMClient};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Substituted when answer generation fails or times out
pub const DEGRADED_ANSWER: &str =
    "No he podido redactar una respuesta ahora mismo. Estos son los platos del catálogo que mejor encajan con tu petición.";

/// Writes the final natural-language answer
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, query: &str, blocks: &[String]) -> Result<String>;
}

/// Chat-model answer generator
pub struct LlmResponseGenerator {
    client: Arc<dyn LLMClient>,
    temperature: f32,
    max_suggestions: usize,
}

impl LlmResponseGenerator {
    pub fn new(client: Arc<dyn LLMClient>, temperature: f32, max_suggestions: usize) -> Self {
        Self {
            client,
            temperature,
            max_suggestions,
        }
    }

    fn instructions(&self) -> String {
        format!(
            "Eres el asistente de una tienda online de tuppers saludables.\n\
             - Ayuda al usuario a planificar sus pedidos según su dieta, presupuesto y preferencias.\n\
             - Recomienda solo platos que aparecen en la lista proporcionada. No inventes platos.\n\
             - Prioriza los platos que mejor se ajustan a la petición.\n\
             - Si el usuario menciona días o semanas, puedes sugerir repeticiones razonables de los platos reales.\n\
             - Limita la lista a los {} platos más relevantes, con sus detalles (proteínas, precio, etc.).\n\
             - No expliques el funcionamiento del sistema.",
            self.max_suggestions
        )
    }
}

pub(crate) fn build_answer_prompt(query: &str, blocks: &[String]) -> String {
    let context = if blocks.is_empty() {
        "(ninguno)".to_string()
    } else {
        blocks.join("\n\n---\n\n")
    };
    format!(
        "Platos disponibles:\n{}\n\nSolicitud del usuario:\n{}\n\n\
         Tu respuesta (concreta, clara, basada solo en los platos reales):",
        context, query
    )
}

#[async_trait]
impl ResponseGenerator for LlmResponseGenerator {
    async fn generate(&self, query: &str, blocks: &[String]) -> Result<String> {
        let messages = vec![
            ChatMessage::system(self.instructions()),
            ChatMessage::user(build_answer_prompt(query, blocks)),
        ];
        let answer = self
            .client
            .chat_completion(messages, self.temperature)
            .await?;
        Ok(answer.trim().to_string())
    }
}
