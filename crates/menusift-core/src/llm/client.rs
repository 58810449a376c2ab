//! Client for OpenAI-compatible chat and embedding endpoints

use super::cache::{chat_key, embedding_key, LLMCache};
use crate::config::LLMServiceConfig;
use crate::error::{MenuSiftError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Chat and embedding backend
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat_completion(&self, messages: Vec<ChatMessage>, temperature: f32)
        -> Result<String>;

    /// Embed texts, one vector per input in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    errors: AtomicU64,
    cache_hits: AtomicU64,
    latency_ms: AtomicU64,
}

/// Request counters at a point in time
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClientStats {
    pub requests: u64,
    pub errors: u64,
    pub cache_hits: u64,
    pub avg_latency_ms: f64,
}

/// Client for OpenRouter, vLLM, OpenAI and similar services
pub struct HttpLLMClient {
    http: reqwest::Client,
    config: LLMServiceConfig,
    cache: LLMCache,
    counters: Counters,
}

impl HttpLLMClient {
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            config,
            cache: LLMCache::new(),
            counters: Counters::default(),
        })
    }

    pub fn stats(&self) -> ClientStats {
        let requests = self.counters.requests.load(Ordering::Relaxed);
        let latency = self.counters.latency_ms.load(Ordering::Relaxed);
        ClientStats {
            requests,
            errors: self.counters.errors.load(Ordering::Relaxed),
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            avg_latency_ms: if requests > 0 {
                latency as f64 / requests as f64
            } else {
                0.0
            },
        }
    }

    async fn post_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let start = Instant::now();
        self.counters.requests.fetch_add(1, Ordering::Relaxed);

        let result = self.send_json(url, body).await;

        self.counters
            .latency_ms
            .fetch_add(start.elapsed().as_millis() as u64, Ordering::Relaxed);
        if result.is_err() {
            self.counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn send_json<Req, Resp>(&self, url: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        if let Some(ref api_key) = self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(MenuSiftError::ExternalCallFailure(format!(
                "{} returned HTTP {}: {}",
                url, status, text
            )));
        }
        Ok(response.json::<Resp>().await?)
    }
}

#[async_trait]
impl LLMClient for HttpLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String> {
        let key = chat_key(
            &self.config.model,
            temperature,
            &serde_json::to_string(&messages)?,
        );
        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!("Cache hit for chat completion");
            self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached);
        }

        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
        };
        let url = format!(
            "{}/v1/chat/completions",
            self.config.url.trim_end_matches('/')
        );

        let response: ChatResponse = self.post_json(&url, &request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MenuSiftError::ExternalCallFailure("empty completion".to_string()))?;

        self.cache.insert(key, content.clone());
        Ok(content)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = &self.config.embedding_model;
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cached = self
                .cache
                .get(&embedding_key(model, text))
                .and_then(|json| serde_json::from_str::<Vec<f32>>(&json).ok());
            if cached.is_some() {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            } else {
                missing.push(i);
            }
            results.push(cached);
        }

        if !missing.is_empty() {
            tracing::debug!(
                "Embedding batch: {} cached, {} to fetch",
                texts.len() - missing.len(),
                missing.len()
            );

            #[derive(Serialize)]
            struct EmbedRequest<'a> {
                model: &'a str,
                input: Vec<&'a str>,
            }

            #[derive(Deserialize)]
            struct EmbedResponse {
                data: Vec<EmbedData>,
            }

            #[derive(Deserialize)]
            struct EmbedData {
                embedding: Vec<f32>,
            }

            let request = EmbedRequest {
                model,
                input: missing.iter().map(|&i| texts[i].as_str()).collect(),
            };
            let url = format!(
                "{}/v1/embeddings",
                self.config.embeddings_url().trim_end_matches('/')
            );

            let response: EmbedResponse = self.post_json(&url, &request).await?;
            if response.data.len() != missing.len() {
                return Err(MenuSiftError::ExternalCallFailure(format!(
                    "expected {} embeddings, got {}",
                    missing.len(),
                    response.data.len()
                )));
            }

            for (&i, data) in missing.iter().zip(response.data) {
                if let Ok(json) = serde_json::to_string(&data.embedding) {
                    self.cache.insert(embedding_key(model, &texts[i]), json);
                }
                results[i] = Some(data.embedding);
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("y").role, "user");
    }

    #[test]
    fn test_new_client_reports_empty_stats() {
        let client = HttpLLMClient::new(LLMServiceConfig::default()).unwrap();
        let stats = client.stats();
        assert_eq!(stats.requests, 0);
        assert_eq!(stats.avg_latency_ms, 0.0);
    }

    #[tokio::test]
    async fn test_empty_embed_batch_makes_no_request() {
        let client = HttpLLMClient::new(LLMServiceConfig::default()).unwrap();
        let out = client.embed_batch(&[]).await.unwrap();
        assert!(out.is_empty());
        assert_eq!(client.stats().requests, 0);
    }
}
