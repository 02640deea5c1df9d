//! Retrieval stage: cosine similarity against the whole corpus.

use crate::corpus::Corpus;

/// A retrieval candidate. Transient: produced per search call, consumed by
/// the rerank and fusion stages, never persisted.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub corpus_id: usize,
    pub vector_score: f32,
    pub rerank_score: Option<f32>,
    pub text: String,
}

/// Top-k corpus rows by cosine similarity to the query vector, descending,
/// ties broken by corpus index ascending. `top_k` larger than the corpus
/// returns the full corpus ranked.
pub fn retrieve(
    query_vector: &[f32],
    embeddings: &[Vec<f32>],
    corpus: &Corpus,
    top_k: usize,
) -> Vec<Candidate> {
    debug_assert!(top_k >= 1);

    let mut scored: Vec<(usize, f32)> = embeddings
        .iter()
        .enumerate()
        .map(|(i, row)| (i, cosine_similarity(query_vector, row)))
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(corpus_id, score)| Candidate {
            corpus_id,
            vector_score: score,
            rerank_score: None,
            text: corpus
                .verse(corpus_id)
                .map(|v| v.text.clone())
                .unwrap_or_default(),
        })
        .collect()
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}
