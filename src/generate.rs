//! Answer generation through an Ollama backend.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::QaError;

/// Produces an answer from a fully composed prompt. The pipeline talks to
/// the backend through this trait so tests can substitute a canned one.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, QaError>;
}

/// Calls Ollama's `/api/generate` endpoint with streaming disabled.
///
/// Generation is a single attempt: a slow or failing model surfaces as
/// [`QaError::Generation`] rather than being retried, since retrying a
/// long-running completion only compounds the wait.
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl AnswerBackend for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, QaError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                QaError::Generation(format!(
                    "request to {} failed: {} (is Ollama running?)",
                    url, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(QaError::Generation(format!(
                "Ollama returned {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| QaError::Generation(format!("invalid response from Ollama: {}", e)))?;

        match json.get("response").and_then(|v| v.as_str()) {
            Some(answer) => Ok(answer.to_string()),
            None => Err(QaError::Generation(
                "Ollama response is missing the 'response' field".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = GenerationConfig {
            model: "deepseek-r1:1.5b".to_string(),
            url: Some("http://localhost:11434/".to_string()),
            timeout_secs: 5,
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        assert_eq!(generator.base_url, "http://localhost:11434");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_generation_error() {
        let config = GenerationConfig {
            model: "m".to_string(),
            // Nothing listens here.
            url: Some("http://127.0.0.1:1".to_string()),
            timeout_secs: 2,
        };
        let generator = OllamaGenerator::new(&config).unwrap();
        let err = generator.generate("prompt").await.unwrap_err();
        assert!(matches!(err, QaError::Generation(_)));
        assert!(err.to_string().contains("Ollama"));
    }
}
