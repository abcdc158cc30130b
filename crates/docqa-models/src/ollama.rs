//! Ollama HTTP collaborators (`/api/embed`, `/api/chat`), blocking request/response.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use docqa_core::error::{Error, Result};
use docqa_core::traits::{Embedder, Generator};

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), timeout })
    }

    fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
        operation: &'static str,
        fail: fn(String) -> Error,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, operation, "ollama request");
        let to_error = |e: reqwest::Error| {
            if e.is_timeout() {
                Error::Timeout { operation, elapsed: self.timeout }
            } else {
                fail(format!("{url}: {e}"))
            }
        };
        let response = self.http.post(&url).json(body).send().map_err(to_error)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(fail(format!("{url}: HTTP {status}: {detail}")));
        }
        response.json::<Resp>().map_err(to_error)
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbedder {
    client: OllamaClient,
    model: String,
    dim: usize,
}

impl OllamaEmbedder {
    pub fn new(client: OllamaClient, model: impl Into<String>, dim: usize) -> Self {
        Self { client, model: model.into(), dim }
    }
}

impl Embedder for OllamaEmbedder {
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { 512 }
    fn id(&self) -> String { format!("ollama:{}:d{}", self.model, self.dim) }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest { model: &self.model, input: texts };
        let response: EmbedResponse = self.client.post("/api/embed", &body, "embed", Error::Embedding)?;
        Ok(response.embeddings)
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ChatReply {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatReply,
}

pub struct OllamaGenerator {
    client: OllamaClient,
    model: String,
    temperature: f32,
}

impl OllamaGenerator {
    pub fn new(client: OllamaClient, model: impl Into<String>, temperature: f32) -> Self {
        Self { client, model: model.into(), temperature }
    }
}

/// The user turn sent alongside the system instruction.
pub fn user_message(question: &str, context: &str) -> String {
    format!("Question: {question}\nContext: {context}")
}

impl Generator for OllamaGenerator {
    fn generate(&self, system: &str, question: &str, context: &str) -> Result<String> {
        let user = user_message(question, context);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: &user },
            ],
            stream: false,
            options: ChatOptions { temperature: self.temperature },
        };
        let response: ChatResponse = self.client.post("/api/chat", &body, "generate", Error::Generation)?;
        Ok(response.message.content)
    }
}
