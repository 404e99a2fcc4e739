use anyhow::{anyhow, Result};
use reqwest::{
  header::{HeaderMap, HeaderValue, CONTENT_TYPE},
  Client,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config;

/// Raised when a request names a backend nobody registered
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
  #[error("Unsupported backend: {0}")]
  Unsupported(String),
}

/// Capability consumed once per requested output: prompt in, completion out.
/// Implementations are swappable without touching orchestrator logic.
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
  /// Name the backend is registered under
  fn name(&self) -> &str;
  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;
}

/// Create the backend registered under `name`.
///
/// Unknown names get a typed `BackendError::Unsupported`, and a missing
/// credential fails here too, so a doomed run is rejected before any worker
/// spawns.
pub fn create_backend(name: &str) -> Result<Arc<dyn GenerativeBackend>> {
  match name.to_lowercase().as_str() {
    "openai" => Ok(Arc::new(OpenAiBackend::new()?)),
    "claude" => Ok(Arc::new(ClaudeBackend::new()?)),
    "gemini" => Ok(Arc::new(GeminiBackend::new()?)),
    "custom" => Ok(Arc::new(CustomBackend::new()?)),
    other => Err(BackendError::Unsupported(other.to_string()).into()),
  }
}

/// Backend names `create_backend` accepts
pub const BACKEND_NAMES: [&str; 4] = ["openai", "claude", "gemini", "custom"];

pub struct OpenAiBackend {
  client: Client,
  api_key: String,
}

impl OpenAiBackend {
  pub fn new() -> Result<Self> {
    Ok(Self { client: Client::new(), api_key: config::require_env("OPENAI_API_KEY")? })
  }
}

#[async_trait::async_trait]
impl GenerativeBackend for OpenAiBackend {
  fn name(&self) -> &str {
    "openai"
  }

  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
    let payload = json!({
      "model": "gpt-4",
      "messages": [{"role": "user", "content": prompt}],
      "temperature": temperature,
    });

    let response = self
      .client
      .post("https://api.openai.com/v1/chat/completions")
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await
      .map_err(|e| anyhow!("OpenAI request failed: {:?}", e))?;

    if !response.status().is_success() {
      return Err(anyhow!("OpenAI request failed with status: {}", response.status()));
    }

    let body: Value =
      response.json().await.map_err(|e| anyhow!("Failed to parse OpenAI response: {:?}", e))?;

    body["choices"][0]["message"]["content"]
      .as_str()
      .map(|s| s.trim().to_string())
      .ok_or_else(|| anyhow!("OpenAI response contained no completion text"))
  }
}

pub struct ClaudeBackend {
  client: Client,
  api_key: String,
}

impl ClaudeBackend {
  pub fn new() -> Result<Self> {
    Ok(Self { client: Client::new(), api_key: config::require_env("ANTHROPIC_API_KEY")? })
  }
}

#[async_trait::async_trait]
impl GenerativeBackend for ClaudeBackend {
  fn name(&self) -> &str {
    "claude"
  }

  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
    let payload = json!({
      "model": "claude-sonnet-4-20250514",
      "max_tokens": 4096,
      "temperature": temperature,
      "messages": [{"role": "user", "content": prompt}],
    });

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let response = self
      .client
      .post("https://api.anthropic.com/v1/messages")
      .headers(headers)
      .json(&payload)
      .send()
      .await
      .map_err(|e| anyhow!("Claude request failed: {:?}", e))?;

    if !response.status().is_success() {
      return Err(anyhow!("Claude request failed with status: {}", response.status()));
    }

    let body: Value =
      response.json().await.map_err(|e| anyhow!("Failed to parse Claude response: {:?}", e))?;

    body["content"][0]["text"]
      .as_str()
      .map(|s| s.trim().to_string())
      .ok_or_else(|| anyhow!("Claude response contained no completion text"))
  }
}

pub struct GeminiBackend {
  client: Client,
  api_key: String,
}

impl GeminiBackend {
  pub fn new() -> Result<Self> {
    Ok(Self { client: Client::new(), api_key: config::require_env("GEMINI_API_KEY")? })
  }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiBackend {
  fn name(&self) -> &str {
    "gemini"
  }

  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
    let url = format!(
      "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-pro:generateContent?key={}",
      self.api_key
    );

    let payload = json!({
      "contents": [{"parts": [{"text": prompt}]}],
      "generationConfig": {"temperature": temperature},
    });

    let response = self
      .client
      .post(&url)
      .json(&payload)
      .send()
      .await
      .map_err(|e| anyhow!("Gemini request failed: {:?}", e))?;

    if !response.status().is_success() {
      return Err(anyhow!("Gemini request failed with status: {}", response.status()));
    }

    let body: Value =
      response.json().await.map_err(|e| anyhow!("Failed to parse Gemini response: {:?}", e))?;

    body["candidates"][0]["content"]["parts"][0]["text"]
      .as_str()
      .map(|s| s.trim().to_string())
      .ok_or_else(|| anyhow!("Gemini response contained no completion text"))
  }
}

/// OpenAI-compatible endpoint at a caller-supplied URL, for self-hosted or
/// proxied models
pub struct CustomBackend {
  client: Client,
  endpoint: String,
  api_key: Option<String>,
  model: String,
}

impl CustomBackend {
  pub fn new() -> Result<Self> {
    Ok(Self {
      client: Client::new(),
      endpoint: config::require_env("DECKHAND_CUSTOM_API_URL")?,
      api_key: std::env::var("DECKHAND_CUSTOM_API_KEY").ok(),
      model: std::env::var("DECKHAND_CUSTOM_MODEL").unwrap_or_else(|_| "gpt-4".to_string()),
    })
  }
}

#[async_trait::async_trait]
impl GenerativeBackend for CustomBackend {
  fn name(&self) -> &str {
    "custom"
  }

  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
    let payload = json!({
      "model": self.model,
      "messages": [{"role": "user", "content": prompt}],
      "temperature": temperature,
    });

    let mut request = self.client.post(&self.endpoint).json(&payload);
    if let Some(key) = &self.api_key {
      request = request.bearer_auth(key);
    }

    let response =
      request.send().await.map_err(|e| anyhow!("Custom backend request failed: {:?}", e))?;

    if !response.status().is_success() {
      return Err(anyhow!("Custom backend request failed with status: {}", response.status()));
    }

    let body: Value = response
      .json()
      .await
      .map_err(|e| anyhow!("Failed to parse custom backend response: {:?}", e))?;

    body["choices"][0]["message"]["content"]
      .as_str()
      .map(|s| s.trim().to_string())
      .ok_or_else(|| anyhow!("Custom backend response contained no completion text"))
  }
}

/// Scripted backend for tests: canned response, optional failure, optional
/// delay so callers can observe an in-flight run, and a call log.
pub struct MockBackend {
  pub response: String,
  pub fail: bool,
  pub delay_ms: u64,
  pub calls: Mutex<Vec<(String, f32)>>,
}

impl MockBackend {
  pub fn new(response: &str) -> Self {
    Self { response: response.to_string(), fail: false, delay_ms: 0, calls: Mutex::new(vec![]) }
  }

  pub fn with_failure(mut self) -> Self {
    self.fail = true;
    self
  }

  pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
    self.delay_ms = delay_ms;
    self
  }

  /// Prompts and temperatures seen so far
  pub fn recorded_calls(&self) -> Vec<(String, f32)> {
    self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
  }
}

#[async_trait::async_trait]
impl GenerativeBackend for MockBackend {
  fn name(&self) -> &str {
    "mock"
  }

  async fn complete(&self, prompt: &str, temperature: f32) -> Result<String> {
    if self.delay_ms > 0 {
      tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
    }

    if let Ok(mut calls) = self.calls.lock() {
      calls.push((prompt.to_string(), temperature));
    }

    if self.fail {
      return Err(anyhow!("Mock backend failure"));
    }

    Ok(self.response.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unknown_backend_is_typed_error() {
    let err = create_backend("copilot").err().unwrap();
    let backend_err = err.downcast_ref::<BackendError>();
    assert_eq!(backend_err, Some(&BackendError::Unsupported("copilot".to_string())));
    assert!(err.to_string().contains("Unsupported backend"));
  }

  #[test]
  fn test_registered_names_never_report_unsupported() {
    // Registered backends may fail on missing credentials, but never as
    // Unsupported
    for name in BACKEND_NAMES {
      match create_backend(name) {
        Ok(backend) => assert_eq!(backend.name(), name),
        Err(err) => assert!(err.downcast_ref::<BackendError>().is_none()),
      }
    }
  }

  #[tokio::test]
  async fn test_mock_backend_records_calls() {
    let backend = MockBackend::new("scripted output");
    let result = backend.complete("write slides", 0.7).await.unwrap();
    assert_eq!(result, "scripted output");

    let calls = backend.recorded_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "write slides");
    assert!((calls[0].1 - 0.7).abs() < 1e-6);
  }

  #[tokio::test]
  async fn test_mock_backend_failure_still_records() {
    let backend = MockBackend::new("ignored").with_failure();
    assert!(backend.complete("prompt", 0.2).await.is_err());
    assert_eq!(backend.recorded_calls().len(), 1);
  }
}
