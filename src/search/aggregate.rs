//! Multi-variant aggregation: run the ranking pipeline once per query
//! variant (translation plus paraphrases) and merge the per-variant results
//! into one ranked list per query.

use std::collections::HashMap;

use tracing::warn;

use crate::corpus::Corpus;
use crate::encoder::SemanticHandle;
use crate::models::QueryRecord;
use crate::search::fusion::{RankedEntry, NO_MATCH};
use crate::search::pipeline::rank_one_variant;

/// Score written when no variant produced a usable result.
pub const AGGREGATE_FAILURE_SCORE: f32 = -999.0;

const FINAL_RESULTS: usize = 5;

pub fn no_match_result() -> RankedEntry {
    RankedEntry {
        document_id: String::new(),
        document_number: NO_MATCH.to_string(),
        rank: 1,
        score: AGGREGATE_FAILURE_SCORE,
    }
}

/// Merge per-variant ranked lists into one list. Each document keeps its
/// maximum score across variants; ties keep the first-seen entry. Sentinel
/// rows (empty document id) never survive the merge.
pub fn merge_variant_results(variant_results: &[Vec<RankedEntry>]) -> Vec<RankedEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, RankedEntry> = HashMap::new();

    for results in variant_results {
        for entry in results {
            if entry.document_id.is_empty() {
                continue;
            }
            match best.get_mut(&entry.document_id) {
                Some(existing) => {
                    // Strict >: an equal score from a later variant loses.
                    if entry.score > existing.score {
                        *existing = entry.clone();
                    }
                }
                None => {
                    order.push(entry.document_id.clone());
                    best.insert(entry.document_id.clone(), entry.clone());
                }
            }
        }
    }

    let mut merged: Vec<RankedEntry> = order
        .iter()
        .filter_map(|id| best.remove(id))
        .collect();
    // Stable sort keeps first-seen order among equal scores.
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(FINAL_RESULTS);
    for (i, entry) in merged.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    merged
}

/// Rank one query record across all its variants. A failing variant is
/// logged and skipped; if nothing survives, the record gets the failure
/// sentinel so batch output stays one-block-per-query.
pub async fn aggregate_record(
    handle: &SemanticHandle,
    corpus: &Corpus,
    record: &QueryRecord,
    pool_k: usize,
) -> Vec<RankedEntry> {
    let mut per_variant = Vec::new();
    for variant in record.variants() {
        match rank_one_variant(handle, corpus, &variant, pool_k).await {
            Ok(entries) => per_variant.push(entries),
            Err(err) => {
                warn!(qid = %record.qid_str(), error = %err, "variant ranking failed");
            }
        }
    }

    let merged = merge_variant_results(&per_variant);
    if merged.is_empty() {
        return vec![no_match_result()];
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{Corpus, VerseRecord};
    use crate::encoder::{EncoderBackend, ScoreFamily};
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Arc;

    fn entry(id: &str, number: &str, score: f32) -> RankedEntry {
        RankedEntry {
            document_id: id.to_string(),
            document_number: number.to_string(),
            rank: 0,
            score,
        }
    }

    #[test]
    fn test_merge_keeps_maximum_score() {
        let merged = merge_variant_results(&[
            vec![entry("12", "2:13", 0.6)],
            vec![entry("12", "2:13", 0.9)],
            vec![entry("12", "2:13", 0.7)],
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].score, 0.9);
        assert_eq!(merged[0].rank, 1);
    }

    #[test]
    fn test_merge_tie_keeps_first_seen() {
        let first = entry("5", "2:6", 0.5);
        let later = RankedEntry {
            document_number: "other".to_string(),
            ..entry("5", "2:6", 0.5)
        };
        let merged = merge_variant_results(&[vec![first], vec![later]]);
        assert_eq!(merged[0].document_number, "2:6");
    }

    #[test]
    fn test_merge_drops_sentinel_rows() {
        let sentinel = RankedEntry {
            document_id: String::new(),
            document_number: NO_MATCH.to_string(),
            rank: 1,
            score: 0.0,
        };
        let merged = merge_variant_results(&[vec![sentinel], vec![entry("3", "2:4", 0.2)]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].document_id, "3");
    }

    #[test]
    fn test_merge_caps_at_five_with_contiguous_ranks() {
        let many: Vec<RankedEntry> = (0..8)
            .map(|i| entry(&i.to_string(), &format!("2:{}", i + 1), 0.9 - i as f32 * 0.1))
            .collect();
        let merged = merge_variant_results(&[many]);
        assert_eq!(merged.len(), 5);
        for (i, e) in merged.iter().enumerate() {
            assert_eq!(e.rank, i + 1);
        }
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(merge_variant_results(&[]).is_empty());
        assert!(merge_variant_results(&[vec![]]).is_empty());
    }

    struct AlwaysFails;

    #[async_trait]
    impl EncoderBackend for AlwaysFails {
        fn family(&self) -> ScoreFamily {
            ScoreFamily::CrossEncoder
        }
        fn can_rerank(&self) -> bool {
            false
        }
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("embedding service down")
        }
        async fn rerank(&self, _query: &str, _passages: &[String]) -> Result<Vec<f32>> {
            anyhow::bail!("unreachable")
        }
    }

    #[tokio::test]
    async fn test_all_variants_failing_yields_failure_sentinel() {
        let handle = SemanticHandle {
            backend: Arc::new(AlwaysFails),
            embeddings: Arc::new(vec![vec![1.0]]),
        };
        let corpus = Corpus::from_records(vec![VerseRecord {
            document_number: "1:1".to_string(),
            document_id: 0,
            text: "verse".to_string(),
        }]);
        let record: QueryRecord =
            serde_json::from_str(r#"{"qid":1,"query_versions":["a","b"]}"#).unwrap();

        let out = aggregate_record(&handle, &corpus, &record, 5).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].document_number, NO_MATCH);
        assert_eq!(out[0].score, AGGREGATE_FAILURE_SCORE);
    }
}
