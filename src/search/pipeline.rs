//! Two-stage search pipeline: vector retrieval, then rerank, then either
//! the online blend (interactive API) or the fusion policy (batch ranking).

use anyhow::Result;
use tracing::debug;

use crate::corpus::Corpus;
use crate::encoder::SemanticHandle;
use crate::models::VerseHit;
use crate::search::fusion::{self, FusionProfile, RankedEntry, ScoredDoc};
use crate::search::rerank::rerank;
use crate::search::retrieve::retrieve;

/// Reranked candidates considered before the online dedup-and-cut.
const ONLINE_WINDOW: usize = 10;

/// Interactive search over the verse corpus. Embeds the raw query, pulls
/// `retrieve_top_k` candidates, reranks them, then blends vector and rerank
/// scores. Backends without a reranker return vector order directly.
pub async fn search_verses(
    handle: &SemanticHandle,
    corpus: &Corpus,
    query: &str,
    top_k: usize,
    retrieve_top_k: usize,
) -> Result<Vec<VerseHit>> {
    let query_vector = handle.backend.embed(query).await?;
    let mut candidates = retrieve(&query_vector, &handle.embeddings, corpus, retrieve_top_k);
    debug!(candidates = candidates.len(), "retrieval stage done");

    rerank(handle.backend.as_ref(), query, &mut candidates).await?;

    if candidates.iter().any(|c| c.rerank_score.is_some()) {
        candidates.sort_by(|a, b| {
            b.rerank_score
                .partial_cmp(&a.rerank_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut seen = std::collections::HashSet::new();
    let mut hits = Vec::new();
    for c in candidates.into_iter().take(ONLINE_WINDOW) {
        if !seen.insert(c.corpus_id) {
            continue;
        }
        let document_number = corpus
            .verse(c.corpus_id)
            .map(|v| v.document_number.clone())
            .unwrap_or_default();
        let final_score = match c.rerank_score {
            Some(r) => (c.vector_score + r) / 2.0,
            None => c.vector_score,
        };
        hits.push(VerseHit {
            corpus_id: c.corpus_id,
            document_number,
            text: c.text,
            vector_score: c.vector_score,
            rerank_score: c.rerank_score,
            final_score,
        });
        if hits.len() == top_k {
            break;
        }
    }
    Ok(hits)
}

/// Batch ranking for one query variant: retrieve a candidate pool, rerank
/// it, and apply the fusion policy matching the backend's score family.
pub async fn rank_one_variant(
    handle: &SemanticHandle,
    corpus: &Corpus,
    query: &str,
    pool_k: usize,
) -> Result<Vec<RankedEntry>> {
    let query_vector = handle.backend.embed(query).await?;
    let mut candidates = retrieve(&query_vector, &handle.embeddings, corpus, pool_k);
    rerank(handle.backend.as_ref(), query, &mut candidates).await?;

    let scored: Vec<ScoredDoc> = candidates
        .iter()
        .map(|c| ScoredDoc {
            document_id: c.corpus_id.to_string(),
            document_number: corpus
                .verse(c.corpus_id)
                .map(|v| v.document_number.clone())
                .unwrap_or_default(),
            score: c.rerank_score.unwrap_or(c.vector_score),
        })
        .collect();

    let profile = FusionProfile::from(handle.backend.family());
    Ok(fusion::fuse(profile, &scored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, VerseRecord};
    use crate::encoder::{EncoderBackend, ScoreFamily};
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Embeds every query to a fixed vector and reranks with scripted scores.
    struct Scripted {
        query_vector: Vec<f32>,
        rerank_scores: Vec<f32>,
        family: ScoreFamily,
        can_rerank: bool,
    }

    #[async_trait]
    impl EncoderBackend for Scripted {
        fn family(&self) -> ScoreFamily {
            self.family
        }
        fn can_rerank(&self) -> bool {
            self.can_rerank
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(self.query_vector.clone())
        }
        async fn rerank(&self, _query: &str, passages: &[String]) -> Result<Vec<f32>> {
            Ok(self
                .rerank_scores
                .iter()
                .copied()
                .take(passages.len())
                .collect())
        }
    }

    fn corpus(n: usize) -> Corpus {
        Corpus::from_records(
            (0..n)
                .map(|i| VerseRecord {
                    document_number: format!("2:{}", i + 1),
                    document_id: i,
                    text: format!("verse {i}"),
                })
                .collect(),
        )
    }

    fn axis_embeddings(n: usize) -> Arc<Vec<Vec<f32>>> {
        // Row i is the i-th axis in an n-dim space: querying with axis 0
        // retrieves row 0 first and all others tied at zero.
        Arc::new(
            (0..n)
                .map(|i| {
                    let mut v = vec![0.0; n];
                    v[i] = 1.0;
                    v
                })
                .collect(),
        )
    }

    fn handle(backend: Scripted, n: usize) -> SemanticHandle {
        SemanticHandle {
            backend: Arc::new(backend),
            embeddings: axis_embeddings(n),
        }
    }

    #[tokio::test]
    async fn test_online_search_orders_by_rerank() {
        let mut query_vector = vec![0.0; 4];
        query_vector[0] = 1.0;
        // Retrieval order 0,1,2,3; rerank inverts it.
        let h = handle(
            Scripted {
                query_vector,
                rerank_scores: vec![0.1, 0.2, 0.3, 0.9],
                family: ScoreFamily::CrossEncoder,
                can_rerank: true,
            },
            4,
        );
        let hits = search_verses(&h, &corpus(4), "q", 5, 4).await.unwrap();
        assert_eq!(hits[0].rerank_score, Some(0.9));
        assert!((hits[0].final_score - (hits[0].vector_score + 0.9) / 2.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_online_search_vector_only_without_reranker() {
        let mut query_vector = vec![0.0; 3];
        query_vector[1] = 1.0;
        let h = handle(
            Scripted {
                query_vector,
                rerank_scores: vec![],
                family: ScoreFamily::CrossEncoder,
                can_rerank: false,
            },
            3,
        );
        let hits = search_verses(&h, &corpus(3), "q", 5, 3).await.unwrap();
        assert_eq!(hits[0].corpus_id, 1);
        assert!(hits[0].rerank_score.is_none());
        assert_eq!(hits[0].final_score, hits[0].vector_score);
    }

    #[tokio::test]
    async fn test_online_search_caps_at_top_k() {
        let mut query_vector = vec![0.0; 8];
        query_vector[0] = 1.0;
        let h = handle(
            Scripted {
                query_vector,
                rerank_scores: vec![0.9; 8],
                family: ScoreFamily::CrossEncoder,
                can_rerank: true,
            },
            8,
        );
        let hits = search_verses(&h, &corpus(8), "q", 5, 8).await.unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[tokio::test]
    async fn test_batch_variant_uses_cross_encoder_fusion() {
        let mut query_vector = vec![0.0; 3];
        query_vector[0] = 1.0;
        let h = handle(
            Scripted {
                query_vector,
                rerank_scores: vec![0.2, 0.8, 0.5],
                family: ScoreFamily::CrossEncoder,
                can_rerank: true,
            },
            3,
        );
        let entries = rank_one_variant(&h, &corpus(3), "q", 3).await.unwrap();
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].score, 0.8);
        assert_eq!(entries.len(), 3);
    }

    #[tokio::test]
    async fn test_batch_variant_llm_profile_rejects_unrelated() {
        let mut query_vector = vec![0.0; 2];
        query_vector[0] = 1.0;
        // Normalized 0.05 is native -4.5: below the rejection cutoff.
        let h = handle(
            Scripted {
                query_vector,
                rerank_scores: vec![0.05, 0.05],
                family: ScoreFamily::LlmJudgment,
                can_rerank: true,
            },
            2,
        );
        let entries = rank_one_variant(&h, &corpus(2), "q", 2).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].document_number, fusion::NO_MATCH);
    }
}
