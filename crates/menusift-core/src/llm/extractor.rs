//! Constraint extraction from free-text queries
//!
//! The model is an untrusted collaborator: its reply is parsed as a JSON
//! object and every key is validated against the attribute schema before it
//! reaches the engine. Timeouts and failures degrade to "no constraints".

use super::{ChatMessage, LLMClient};
use crate::constraints::ConstraintSet;
use crate::error::{MenuSiftError, Result, SchemaViolation};
use crate::schema::{AttributeSchema, AttributeType};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Source of raw, unvalidated attribute constraints
#[async_trait]
pub trait ConstraintSource: Send + Sync {
    async fn extract_raw(&self, query: &str) -> Result<Map<String, Value>>;
}

/// Constraint source backed by a chat model
pub struct LlmConstraintSource {
    client: Arc<dyn LLMClient>,
    instructions: String,
    temperature: f32,
}

impl LlmConstraintSource {
    pub fn new(client: Arc<dyn LLMClient>, schema: &AttributeSchema, temperature: f32) -> Self {
        Self {
            client,
            instructions: build_extraction_prompt(schema),
            temperature,
        }
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }
}

#[async_trait]
impl ConstraintSource for LlmConstraintSource {
    async fn extract_raw(&self, query: &str) -> Result<Map<String, Value>> {
        let messages = vec![
            ChatMessage::system(self.instructions.clone()),
            ChatMessage::user(format!("Pregunta: {}", query)),
        ];
        let reply = self
            .client
            .chat_completion(messages, self.temperature)
            .await?;
        parse_json_object(&reply)
    }
}

fn build_extraction_prompt(schema: &AttributeSchema) -> String {
    let mut keys = String::new();
    for spec in schema.iter() {
        let hint = match spec.kind {
            AttributeType::Boolean => "booleano".to_string(),
            AttributeType::Number => {
                let unit = spec
                    .unit
                    .as_deref()
                    .map(|u| format!(" (en {})", u))
                    .unwrap_or_default();
                format!(
                    "cadena de comparación como \"<400\", \">=20\" o \"=5\"{}",
                    unit
                )
            }
            AttributeType::Category => "lista de valores aceptables".to_string(),
        };
        keys.push_str(&format!("- {}: {}\n", spec.name, hint));
    }

    format!(
        "Eres un asistente que extrae filtros estructurados de preguntas sobre comida. \
         La respuesta debe ser un objeto JSON válido y NADA MÁS. No expliques nada.\n\n\
         Devuelve solo las claves relevantes entre:\n{}\n\
         Si la pregunta no impone ningún filtro, devuelve {{}}.",
        keys
    )
}

/// Extract the outermost JSON object from a model reply
pub fn parse_json_object(reply: &str) -> Result<Map<String, Value>> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(MenuSiftError::Parse(format!(
                "no JSON object in reply: {}",
                truncate(reply, 120)
            )))
        }
    };

    match serde_json::from_str::<Value>(json)? {
        Value::Object(map) => Ok(map),
        other => Err(MenuSiftError::Parse(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}

/// Validated constraints for one query
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub constraints: ConstraintSet,
    pub dropped: Vec<SchemaViolation>,
    /// The source failed or timed out and an empty set was substituted
    pub degraded: bool,
}

/// Schema-validating wrapper around a [`ConstraintSource`]
pub struct ConstraintExtractor {
    source: Arc<dyn ConstraintSource>,
    schema: AttributeSchema,
    timeout: Duration,
}

impl ConstraintExtractor {
    pub fn new(source: Arc<dyn ConstraintSource>, schema: AttributeSchema, timeout: Duration) -> Self {
        Self {
            source,
            schema,
            timeout,
        }
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Extract and validate constraints. Never fails.
    pub async fn extract(&self, query: &str) -> Extraction {
        if query.trim().is_empty() {
            return Extraction::default();
        }

        let raw = match tokio::time::timeout(self.timeout, self.source.extract_raw(query)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!("Constraint extraction failed, continuing unconstrained: {}", e);
                return Extraction {
                    degraded: true,
                    ..Extraction::default()
                };
            }
            Err(_) => {
                tracing::warn!(
                    "Constraint extraction timed out after {:?}, continuing unconstrained",
                    self.timeout
                );
                return Extraction {
                    degraded: true,
                    ..Extraction::default()
                };
            }
        };

        let validated = ConstraintSet::from_raw(&raw, &self.schema);
        tracing::debug!(
            "Extracted constraints: {} ({} dropped)",
            validated.constraints,
            validated.dropped.len()
        );
        Extraction {
            constraints: validated.constraints,
            dropped: validated.dropped,
            degraded: false,
        }
    }
}
