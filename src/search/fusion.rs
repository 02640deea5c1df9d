//! Fusion & threshold policy: raw rerank scores in, ranked deduplicated
//! results out.
//!
//! The two profiles are deliberately not unified onto one scale. Learned
//! cross-encoders emit raw scores compared only against each other, while
//! LLM judges emit normalized 0..1 scores whose accept/reject thresholds
//! are defined on the judge's native -5..5 scale.

use std::collections::HashSet;

use crate::encoder::ScoreFamily;

/// Reserved document number meaning "no relevant document found".
pub const NO_MATCH: &str = "-1";

/// Final results per query, both online and in ranked output files.
pub const MAX_RESULTS: usize = 5;

/// How many reranked candidates the LLM-judgment profile inspects.
const JUDGMENT_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionProfile {
    /// Bi-encoder + learned cross-encoder: raw scores, sort and cut.
    CrossEncoder,
    /// LLM similarity judge: three-tier thresholds on the native scale.
    LlmJudgment,
}

impl From<ScoreFamily> for FusionProfile {
    fn from(family: ScoreFamily) -> Self {
        match family {
            ScoreFamily::CrossEncoder => FusionProfile::CrossEncoder,
            ScoreFamily::LlmJudgment => FusionProfile::LlmJudgment,
        }
    }
}

/// A rerank-scored candidate entering fusion. `score` is on the scale of
/// the profile that will consume it.
#[derive(Debug, Clone)]
pub struct ScoredDoc {
    pub document_id: String,
    pub document_number: String,
    pub score: f32,
}

/// One row of a ranked result set.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
    pub document_id: String,
    pub document_number: String,
    /// 1-based, contiguous within a result set
    pub rank: usize,
    pub score: f32,
}

pub fn round2(x: f32) -> f32 {
    (x * 100.0).round() / 100.0
}

/// Apply the fusion policy for `profile` to rerank-scored candidates.
/// Output invariants: unique document numbers, contiguous 1-based ranks,
/// non-increasing scores, scores rounded to 2 decimals. The cross-encoder
/// profile caps at [`MAX_RESULTS`]; the judgment profile's confident tier
/// is bounded only by its candidate window.
pub fn fuse(profile: FusionProfile, candidates: &[ScoredDoc]) -> Vec<RankedEntry> {
    match profile {
        FusionProfile::CrossEncoder => fuse_cross_encoder(candidates),
        FusionProfile::LlmJudgment => fuse_llm_judgment(candidates),
    }
}

fn sort_descending(candidates: &[ScoredDoc]) -> Vec<ScoredDoc> {
    let mut sorted = candidates.to_vec();
    // Stable sort: equal scores keep input order, so dedup keeps the
    // earliest occurrence.
    sorted.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
}

fn assign_ranks(entries: &mut [RankedEntry]) {
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
}

fn fuse_cross_encoder(candidates: &[ScoredDoc]) -> Vec<RankedEntry> {
    let mut sorted = sort_descending(candidates);
    for c in &mut sorted {
        c.score = round2(c.score);
    }

    let mut seen = HashSet::new();
    let mut entries: Vec<RankedEntry> = Vec::new();
    for c in &sorted {
        if !seen.insert(c.document_number.clone()) {
            continue;
        }
        entries.push(RankedEntry {
            document_id: c.document_id.clone(),
            document_number: c.document_number.clone(),
            rank: 0,
            score: c.score,
        });
    }

    // The no-match sentinel is only meaningful as the sole result: keep it
    // alone when it won, drop it when anything outranked it.
    if let Some(pos) = entries.iter().position(|e| e.document_number == NO_MATCH) {
        if pos == 0 {
            entries.truncate(1);
        } else {
            entries.remove(pos);
        }
    }

    entries.truncate(MAX_RESULTS);
    assign_ranks(&mut entries);
    entries
}

fn fuse_llm_judgment(candidates: &[ScoredDoc]) -> Vec<RankedEntry> {
    let sorted = sort_descending(candidates);

    let mut seen = HashSet::new();
    let mut entries: Vec<RankedEntry> = Vec::new();
    let mut top_native = 0.0f32;

    for (i, c) in sorted.iter().take(JUDGMENT_WINDOW).enumerate() {
        // Thresholds are defined on the judge's native -5..5 scale, before
        // the (raw + 5) / 10 normalization.
        let native = c.score * 10.0 - 5.0;
        if i == 0 {
            top_native = native;
            if top_native < -3.0 {
                // Best match judged unrelated: report "no answer" rather
                // than weak guesses.
                return vec![sentinel(round2(native))];
            }
        }

        if top_native >= 1.0 || native >= 1.0 {
            // Confident tier: accept freely, the window is the only cap.
            if seen.insert(c.document_number.clone()) {
                entries.push(accepted(c, native));
            }
        } else if native >= -2.0 {
            // Weak tier: accept while room remains.
            if entries.len() < MAX_RESULTS && seen.insert(c.document_number.clone()) {
                entries.push(accepted(c, native));
            }
        }
        // Below -2: skip silently.
    }

    if entries.is_empty() {
        return vec![sentinel(0.0)];
    }

    assign_ranks(&mut entries);
    entries
}

fn accepted(c: &ScoredDoc, native: f32) -> RankedEntry {
    RankedEntry {
        document_id: c.document_id.clone(),
        document_number: c.document_number.clone(),
        rank: 0,
        score: round2(native),
    }
}

fn sentinel(score: f32) -> RankedEntry {
    RankedEntry {
        document_id: String::new(),
        document_number: NO_MATCH.to_string(),
        rank: 1,
        score,
    }
}
