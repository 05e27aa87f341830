//! Embedding provider calls.
//!
//! Maps a batch of texts to one fixed-dimensional vector per text through a
//! hosted model, order-preserving. Two providers are supported:
//!
//! - **`hf`** — the Hugging Face Inference API feature-extraction endpoint.
//!   Requires the `HUGGINGFACE_API_KEY` environment variable.
//! - **`ollama`** — a local Ollama instance's `/api/embed` endpoint.
//!
//! A batch either succeeds as a whole or fails as a whole; there are no
//! partial results. Calls carry a bounded timeout, and `max_retries`
//! (default 0 — single attempt, fail-fast) controls the retry loop for
//! transient failures with exponential backoff: 1s, 2s, 4s, 8s, 16s, 32s
//! (capped at 2^5).

use anyhow::{bail, Result};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::service::ServiceError;

/// Default Hugging Face Inference API base URL.
const HF_API_BASE: &str = "https://api-inference.huggingface.co";

/// Default Ollama base URL.
const OLLAMA_BASE: &str = "http://localhost:11434";

/// Embed a batch of texts using the configured provider.
///
/// Returns one vector per input text, in input order. The batch is split
/// into sub-batches of `config.batch_size` texts per API call.
///
/// # Errors
///
/// Fails with a [`ServiceError`] if the backend is unreachable, times out,
/// or returns an error response, and with a plain error if the response
/// does not contain exactly one vector per input.
pub async fn embed_texts(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(config.batch_size.max(1)) {
        let batch_vecs = match config.provider.as_str() {
            "hf" => embed_hf(config, batch).await?,
            "ollama" => embed_ollama(config, batch).await?,
            other => bail!("Unknown embedding provider: {}", other),
        };

        if batch_vecs.len() != batch.len() {
            bail!(
                "Embedding response count mismatch: sent {} texts, got {} vectors",
                batch.len(),
                batch_vecs.len()
            );
        }

        embeddings.extend(batch_vecs);
    }

    Ok(embeddings)
}

/// Embed a single query text (batch of one).
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>> {
    let results = embed_texts(config, &[text.to_string()]).await?;
    results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Call the Hugging Face feature-extraction endpoint for one batch.
///
/// `POST {base}/models/{model}` with `{"inputs": [...]}`; the response is
/// a JSON array of float arrays, one per input.
async fn embed_hf(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let api_key = std::env::var("HUGGINGFACE_API_KEY")
        .map_err(|_| anyhow::anyhow!("HUGGINGFACE_API_KEY environment variable not set"))?;

    let base = config.url.as_deref().unwrap_or(HF_API_BASE);
    let url = format!("{}/models/{}", base.trim_end_matches('/'), config.model);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "inputs": texts,
        "options": { "wait_for_model": true },
    });

    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!("retrying embedding call in {:?}", delay);
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
                    service: "embedding",
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
                let err = ServiceError::from_request("embedding", config.timeout_secs, &e);
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
        .unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
}

/// Parse the feature-extraction response: an array of float arrays.
fn parse_hf_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let rows = json
        .as_array()
        .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: expected an array"))?;

    let mut embeddings = Vec::with_capacity(rows.len());

    for row in rows {
        let values = row
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid embedding response: row is not an array"))?;

        let vec: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

/// Call a local Ollama instance's embed endpoint for one batch.
async fn embed_ollama(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let base = config.url.as_deref().unwrap_or(OLLAMA_BASE);
    let url = format!("{}/api/embed", base.trim_end_matches('/'));

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": config.model,
        "input": texts,
    });

    let mut last_err: Option<ServiceError> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tracing::debug!("retrying embedding call in {:?}", delay);
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
                    service: "embedding",
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
                let err = ServiceError::from_request("embedding", config.timeout_secs, &e);
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
        .unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
}

/// Parse the Ollama embed response: `{"embeddings": [[...], ...]}`.
fn parse_ollama_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing embeddings array"))?;

    let mut result = Vec::with_capacity(embeddings.len());

    for embedding in embeddings {
        let vec: Vec<f32> = embedding
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: embedding is not an array"))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        result.push(vec);
    }

    Ok(result)
}
