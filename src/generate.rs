//! Prompt assembly and hosted text generation.
//!
//! Builds a grounding prompt from the retrieved chunks and the query, then
//! calls the configured generation backend with a bounded output-length
//! budget. When retrieval produced nothing, the caller short-circuits to
//! [`NO_DOCUMENTS_RESPONSE`] without touching the network — an answer with
//! no grounding is worse than no answer.

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::service::ServiceError;

/// Fixed response for queries with no retrieved context.
pub const NO_DOCUMENTS_RESPONSE: &str = "No relevant documents found.";

/// Default Hugging Face Inference API base URL.
const HF_API_BASE: &str = "https://api-inference.huggingface.co";

/// Default Ollama base URL.
const OLLAMA_BASE: &str = "http://localhost:11434";

/// Assemble the generation prompt: retrieved chunks verbatim, newline
/// joined, followed by the query.
pub fn build_prompt(chunks: &[String], query: &str) -> String {
    format!(
        "Use the following excerpts to answer the question:\n{}\n\nQuery: {}",
        chunks.join("\n"),
        query
    )
}

/// Generate a response for a prompt through the configured provider.
///
/// Single attempt by default; failure is surfaced to the caller as a
/// [`ServiceError`], never swallowed.
pub async fn generate(config: &GenerationConfig, prompt: &str) -> Result<String> {
    match config.provider.as_str() {
        "hf" => generate_hf(config, prompt).await,
        "ollama" => generate_ollama(config, prompt).await,
        other => bail!("Unknown generation provider: {}", other),
    }
}

/// Call the Hugging Face text-generation endpoint.
///
/// `POST {base}/models/{model}` with the prompt and a `max_new_tokens`
/// budget; the response is `[{"generated_text": "..."}]`.
async fn generate_hf(config: &GenerationConfig, prompt: &str) -> Result<String> {
    let api_key = std::env::var("HUGGINGFACE_API_KEY")
        .map_err(|_| anyhow::anyhow!("HUGGINGFACE_API_KEY environment variable not set"))?;

    let base = config.url.as_deref().unwrap_or(HF_API_BASE);
    let url = format!("{}/models/{}", base.trim_end_matches('/'), config.model);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "inputs": prompt,
        "parameters": {
            "max_new_tokens": config.max_new_tokens,
            "return_full_text": false,
        },
    });

    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!("retrying generation call in {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_hf_response(&json);
                }

                let err = ServiceError::Api {
                    service: "generation",
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                };
                if err.is_retryable() && attempt < config.max_retries {
                    last_err = Some(err);
                    continue;
                }
                return Err(err.into());
            }
            Err(e) => {
                let err = ServiceError::from_request("generation", config.timeout_secs, &e);
                if attempt < config.max_retries {
                    last_err = Some(err);
                    continue;
                }
                return Err(err.into());
            }
        }
    }

    Err(last_err
        .map(Into::into)
        .unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

/// Parse the text-generation response: `[{"generated_text": "..."}]`.
fn parse_hf_response(json: &serde_json::Value) -> Result<String> {
    json.as_array()
        .and_then(|items| items.first())
        .and_then(|item| item.get("generated_text"))
        .and_then(|text| text.as_str())
        .map(|text| text.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid generation response: missing generated_text"))
}

/// Call a local Ollama instance's generate endpoint.
async fn generate_ollama(config: &GenerationConfig, prompt: &str) -> Result<String> {
    let base = config.url.as_deref().unwrap_or(OLLAMA_BASE);
    let url = format!("{}/api/generate", base.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "prompt": prompt,
        "stream": false,
        "options": { "num_predict": config.max_new_tokens },
    });

    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!("retrying generation call in {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        let resp = client.post(&url).json(&body).send().await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_ollama_response(&json);
                }

                let err = ServiceError::Api {
                    service: "generation",
                    status: status.as_u16(),
                    message: response.text().await.unwrap_or_default(),
                };
                if err.is_retryable() && attempt < config.max_retries {
                    last_err = Some(err);
                    continue;
                }
                return Err(err.into());
            }
            Err(e) => {
                let err = ServiceError::from_request("generation", config.timeout_secs, &e);
                if attempt < config.max_retries {
                    last_err = Some(err);
                    continue;
                }
                return Err(err.into());
            }
        }
    }

    Err(last_err
        .map(Into::into)
        .unwrap_or_else(|| anyhow::anyhow!("Generation failed after retries")))
}

/// Parse the Ollama generate response: `{"response": "..."}`.
fn parse_ollama_response(json: &serde_json::Value) -> Result<String> {
    json.get("response")
        .and_then(|text| text.as_str())
        .map(|text| text.to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_prompt_contains_chunks_and_query() {
        let chunks = vec!["Bananas are yellow.".to_string(), "Apples are red.".to_string()];
        let prompt = build_prompt(&chunks, "What color are bananas?");
        assert!(prompt.starts_with("Use the following excerpts"));
        assert!(prompt.contains("Bananas are yellow.\nApples are red."));
        assert!(prompt.ends_with("Query: What color are bananas?"));
    }

    #[test]
    fn test_parse_hf_response() {
        let json = serde_json::json!([{"generated_text": "Yellow."}]);
        assert_eq!(parse_hf_response(&json).unwrap(), "Yellow.");
    }

    #[test]
    fn test_parse_hf_response_empty_array() {
        let json = serde_json::json!([]);
        assert!(parse_hf_response(&json).is_err());
    }

    #[test]
    fn test_parse_ollama_response() {
        let json = serde_json::json!({"response": "Yellow.", "done": true});
        assert_eq!(parse_ollama_response(&json).unwrap(), "Yellow.");
    }
}
