//! Embedding client used by the CLI.
//!
//! Agents calling `hybrid_search_products` compute their own query vectors,
//! so the server never embeds. The CLI does: `catalog search --mode hybrid`
//! embeds the query, and `catalog embed pending` indexes products that have
//! no embedding yet.
//!
//! # Providers
//!
//! - `disabled`: every call fails with a descriptive error.
//! - `openai`: `POST /v1/embeddings`, key from `OPENAI_API_KEY`.
//!
//! # Retry Strategy
//!
//! - HTTP 429 and 5xx → retry with exponential backoff (1s, 2s, 4s, … capped at 32s)
//! - Other 4xx → fail immediately
//! - Network errors → retry

use anyhow::{anyhow, bail, Result};
use std::time::Duration;
use tracing::warn;

use crate::config::EmbeddingConfig;

const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Embed a batch of texts with the configured provider, in input order.
pub async fn embed_texts(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = match config.provider.as_str() {
        "openai" => embed_openai(config, texts).await?,
        "disabled" => bail!("Embedding provider is disabled. Set [embedding] provider in config."),
        other => bail!("Unknown embedding provider: {}", other),
    };

    if let Some(v) = vectors.iter().find(|v| v.len() != config.dims) {
        bail!(
            "embedding model returned {} dimensions, config expects {}",
            v.len(),
            config.dims
        );
    }
    Ok(vectors)
}

/// Embed a single query text.
pub async fn embed_query(config: &EmbeddingConfig, text: &str) -> Result<Vec<f32>> {
    embed_texts(config, &[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Empty embedding response"))
}

async fn embed_openai(config: &EmbeddingConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
    let model = config
        .model
        .as_ref()
        .ok_or_else(|| anyhow!("embedding.model required"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
        "dimensions": config.dims,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post(OPENAI_EMBEDDINGS_URL)
            .bearer_auth(&api_key)
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_openai_response(&json);
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    warn!(%status, attempt, "embedding request failed, retrying");
                    last_err = Some(anyhow!("OpenAI API error {}: {}", status, body_text));
                    continue;
                }

                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                warn!(error = %e, attempt, "embedding request failed, retrying");
                last_err = Some(e.into());
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow!("Embedding failed after retries")))
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow!("Invalid OpenAI response: missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .unwrap_or(position as u64);
        let vec = embedding
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow!("Invalid OpenAI response: non-numeric embedding value"))
            })
            .collect::<Result<Vec<f32>>>()?;
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
