//! Bi-encoder + cross-encoder backend over HTTP.
//!
//! Embeddings come from an OpenAI-compatible `/v1/embeddings` endpoint;
//! reranking goes through a cross-encoder sidecar's `/v1/rerank` endpoint
//! as a single batch request. Cross-encoder scores are used as returned,
//! without normalization.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::encoder::{EncoderBackend, ScoreFamily};

/// Maximum characters sent per text to the embedding API. Keeps dense
/// multilingual content safely under typical 8k-token contexts.
const MAX_EMBED_CHARS: usize = 3_000;

pub struct TransformerBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    reranker: Option<RerankerEndpoint>,
}

/// Cross-encoder sidecar coordinates.
pub struct RerankerEndpoint {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl TransformerBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        embedding_model: String,
        reranker: Option<RerankerEndpoint>,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            embedding_model,
            reranker,
        }
    }
}

#[async_trait]
impl EncoderBackend for TransformerBackend {
    fn family(&self) -> ScoreFamily {
        ScoreFamily::CrossEncoder
    }

    fn can_rerank(&self) -> bool {
        self.reranker.is_some()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        embed_single(
            &self.client,
            &self.base_url,
            self.api_key.as_deref(),
            &self.embedding_model,
            text,
        )
        .await
    }

    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let reranker = self
            .reranker
            .as_ref()
            .context("Reranker endpoint not configured")?;
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/rerank", reranker.base_url.trim_end_matches('/'));
        let req = RerankRequest {
            model: reranker.model.clone(),
            query: query.to_string(),
            documents: passages.to_vec(),
            top_n: passages.len(),
        };

        let timeout = Duration::from_secs(reranker.timeout_secs.min(30));
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .json(&req)
            .send()
            .await
            .context("Failed to reach reranker endpoint")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Reranker returned {status}: {body}");
        }

        let body: RerankResponse = resp
            .json()
            .await
            .context("Failed to parse reranker response")?;

        // The sidecar returns results sorted by score; restore passage order.
        let mut scores = vec![0.0f32; passages.len()];
        for r in body.results {
            if let Some(slot) = scores.get_mut(r.index) {
                *slot = r.relevance_score;
            }
        }
        Ok(scores)
    }
}

/// Truncate to at most `MAX_EMBED_CHARS`, splitting on a UTF-8 char boundary.
fn truncate_for_embedding(text: &str) -> &str {
    if text.len() <= MAX_EMBED_CHARS {
        return text;
    }
    let mut end = MAX_EMBED_CHARS;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Shared embedding call for all HTTP-backed encoders.
pub(crate) async fn embed_single(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
    model: &str,
    text: &str,
) -> Result<Vec<f32>> {
    let url = format!("{}/v1/embeddings", base_url.trim_end_matches('/'));
    let req = EmbedRequest {
        model: model.to_string(),
        input: vec![truncate_for_embedding(text).to_string()],
    };

    let resp = client
        .post(&url)
        .header(
            "Authorization",
            format!("Bearer {}", api_key.unwrap_or_default()),
        )
        .json(&req)
        .send()
        .await
        .context("Failed to call embeddings API")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("Embeddings API returned {status}: {body}");
    }

    let body: EmbedResponse = resp
        .json()
        .await
        .context("Failed to parse embeddings response")?;

    body.data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .context("No embedding returned")
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct RerankRequest {
    model: String,
    query: String,
    documents: Vec<String>,
    top_n: usize,
}

#[derive(Deserialize)]
struct RerankResponse {
    results: Vec<RerankResultRaw>,
}

#[derive(Deserialize)]
struct RerankResultRaw {
    index: usize,
    relevance_score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_for_embedding("hello"), "hello");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // Multi-byte chars around the limit must not be split.
        let text = "م".repeat(MAX_EMBED_CHARS);
        let truncated = truncate_for_embedding(&text);
        assert!(truncated.len() <= MAX_EMBED_CHARS);
        assert!(text.is_char_boundary(truncated.len()));
    }
}
