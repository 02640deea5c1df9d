//! Rerank stage: score retrieval candidates with the backend's
//! cross-encoder or similarity judge.

use anyhow::Result;

use crate::encoder::EncoderBackend;
use crate::search::retrieve::Candidate;
use crate::text::normalize;

/// Populate `rerank_score` on each candidate. The query is normalized before
/// scoring; candidates keep their retrieval order. Backends without rerank
/// capability leave scores untouched.
pub async fn rerank(
    backend: &dyn EncoderBackend,
    query: &str,
    candidates: &mut [Candidate],
) -> Result<()> {
    if candidates.is_empty() || !backend.can_rerank() {
        return Ok(());
    }

    let normalized_query = normalize(query);
    let passages: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();

    let scores = backend.rerank(&normalized_query, &passages).await?;

    for (candidate, score) in candidates.iter_mut().zip(scores) {
        candidate.rerank_score = Some(score);
    }
    Ok(())
}
