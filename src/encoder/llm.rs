//! LLM similarity-judgment backend.
//!
//! Reranking asks a completion model to rate the similarity of two texts on
//! a -5..5 scale and parses the first number out of the reply. The score is
//! normalized to 0..1 via `(raw + 5) / 10`; replies with no parsable number
//! score 0.0 rather than failing the query.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::encoder::transformer::embed_single;
use crate::encoder::{EncoderBackend, ScoreFamily};

pub struct LlmBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    embedding_model: String,
}

impl LlmBackend {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: String,
        chat_model: String,
        embedding_model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            chat_model,
            embedding_model,
        }
    }

    async fn similarity_score(&self, text1: &str, text2: &str) -> Result<f32> {
        let prompt = format!(
            "Compare the similarity in meaning of these two texts and give a score \
             from -5 to 5, where:\n\
             5 means they have exactly the same meaning\n\
             0 means they are unrelated\n\
             -5 means they have completely opposite meanings\n\
             Answer with only the number.\n\n\
             Text 1: {text1}\n\
             Text 2: {text2}\n\n\
             Similarity score:"
        );

        let url = format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        );
        let req = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: 4,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await
            .context("Failed to call chat API for similarity judgment")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat API returned {status}: {body}");
        }

        let body: ChatResponse = resp.json().await?;
        let reply = body
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(normalize_judgment(&reply))
    }
}

/// Parse the model's reply into a normalized 0..1 score. Unparsable replies
/// score 0.0, the stage is best-effort lenient.
fn normalize_judgment(reply: &str) -> f32 {
    match extract_number(reply) {
        Some(raw) => (raw + 5.0) / 10.0,
        None => 0.0,
    }
}

/// First signed decimal number in the text, if any.
fn extract_number(text: &str) -> Option<f32> {
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let negative =
            chars[i] == '-' && i + 1 < chars.len() && chars[i + 1].is_ascii_digit();
        if chars[i].is_ascii_digit() || negative {
            let start = i;
            if negative {
                i += 1;
            }
            let mut seen_dot = false;
            while i < chars.len() && (chars[i].is_ascii_digit() || (chars[i] == '.' && !seen_dot))
            {
                if chars[i] == '.' {
                    seen_dot = true;
                }
                i += 1;
            }
            let token: String = chars[start..i].iter().collect();
            return token.trim_end_matches('.').parse().ok();
        }
        i += 1;
    }
    None
}

#[async_trait]
impl EncoderBackend for LlmBackend {
    fn family(&self) -> ScoreFamily {
        ScoreFamily::LlmJudgment
    }

    fn can_rerank(&self) -> bool {
        true
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        embed_single(
            &self.client,
            &self.base_url,
            Some(&self.api_key),
            &self.embedding_model,
            text,
        )
        .await
    }

    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(passages.len());
        for passage in passages {
            let score = match self.similarity_score(query, passage).await {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("Similarity judgment failed, scoring 0.0: {e}");
                    0.0
                }
            };
            scores.push(score);
        }
        Ok(scores)
    }
}

// ─── Request/Response types ────────────────────────────

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}
