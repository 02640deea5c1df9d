//! Retrieval-quality evaluation: MAP@k and MRR of a ranked run against
//! gold relevance judgments.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

/// Gold judgments: qid -> set of relevant document numbers.
pub type Qrels = HashMap<String, HashSet<String>>;

/// System output: qid -> document numbers in rank order.
pub type Run = HashMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct EvalReport {
    pub mean_map: f32,
    pub mean_mrr: f32,
    /// Queries present in both qrels and run
    pub evaluated: usize,
    /// Queries judged but absent from the run (scored as zero)
    pub missing_from_system: usize,
    /// Run queries with no judgments (ignored)
    pub extra_in_system: usize,
}

/// Load whitespace-separated qrels rows: `qid iter doc relevance`. Rows
/// with relevance 0 or below are non-relevant and skipped.
pub fn load_qrels(path: &Path) -> Result<Qrels> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read qrels file {}", path.display()))?;

    let mut qrels: Qrels = HashMap::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let relevance: i32 = fields[3].parse().unwrap_or(0);
        if relevance <= 0 {
            continue;
        }
        qrels
            .entry(fields[0].to_string())
            .or_default()
            .insert(fields[2].to_string());
    }
    Ok(qrels)
}

/// Load a tab-separated run file: `qid Q0 doc rank score tag`. Rows are
/// grouped per qid and ordered by the rank column.
pub fn load_run(path: &Path) -> Result<Run> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file {}", path.display()))?;

    let mut ranked: HashMap<String, Vec<(usize, String)>> = HashMap::new();
    for line in content.lines() {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 6 {
            continue;
        }
        let rank: usize = fields[3]
            .parse()
            .with_context(|| format!("Bad rank in run row: {line}"))?;
        ranked
            .entry(fields[0].to_string())
            .or_default()
            .push((rank, fields[2].to_string()));
    }

    let mut run: Run = HashMap::new();
    for (qid, mut rows) in ranked {
        rows.sort_by_key(|(rank, _)| *rank);
        run.insert(qid, rows.into_iter().map(|(_, doc)| doc).collect());
    }
    Ok(run)
}

/// AP@k: precision at each relevant hit within the top k, averaged over the
/// number of hits. No hits scores 0.0.
pub fn average_precision_at_k(ranked: &[String], relevant: &HashSet<String>, k: usize) -> f32 {
    let mut hits = 0usize;
    let mut precision_sum = 0.0f32;
    for (i, doc) in ranked.iter().take(k).enumerate() {
        if relevant.contains(doc) {
            hits += 1;
            precision_sum += hits as f32 / (i + 1) as f32;
        }
    }
    if hits == 0 {
        return 0.0;
    }
    precision_sum / hits as f32
}

/// 1 / rank of the first relevant document, 0 when none is found.
pub fn reciprocal_rank(ranked: &[String], relevant: &HashSet<String>) -> f32 {
    for (i, doc) in ranked.iter().enumerate() {
        if relevant.contains(doc) {
            return 1.0 / (i + 1) as f32;
        }
    }
    0.0
}

/// Score a run against qrels. Means are taken over the queries present in
/// both files; judged queries missing from the run and unjudged run queries
/// are surfaced in the report and logged, since either usually means
/// mismatched files.
pub fn evaluate(qrels: &Qrels, run: &Run, k: usize) -> EvalReport {
    let mut map_sum = 0.0f32;
    let mut mrr_sum = 0.0f32;
    let mut evaluated = 0usize;
    let mut missing = 0usize;

    for (qid, relevant) in qrels {
        match run.get(qid) {
            Some(ranked) => {
                map_sum += average_precision_at_k(ranked, relevant, k);
                mrr_sum += reciprocal_rank(ranked, relevant);
                evaluated += 1;
            }
            None => missing += 1,
        }
    }

    let extra = run.keys().filter(|qid| !qrels.contains_key(*qid)).count();
    if missing > 0 {
        warn!(missing, "judged queries absent from the run");
    }
    if extra > 0 {
        warn!(extra, "run queries without judgments");
    }

    let total = evaluated.max(1) as f32;
    EvalReport {
        mean_map: map_sum / total,
        mean_mrr: mrr_sum / total,
        evaluated,
        missing_from_system: missing,
        extra_in_system: extra,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn set(docs: &[&str]) -> HashSet<String> {
        docs.iter().map(|d| d.to_string()).collect()
    }

    fn ranked(docs: &[&str]) -> Vec<String> {
        docs.iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_average_precision_partial_hits() {
        // Relevant at ranks 1 and 3 of {A, C}: (1/1 + 2/3) / 2
        let ap = average_precision_at_k(&ranked(&["A", "B", "C"]), &set(&["A", "C"]), 10);
        assert!((ap - 0.8333).abs() < 1e-3);
    }

    #[test]
    fn test_average_precision_divides_by_hit_count() {
        // One hit at rank 1; the unfound relevant doc does not shrink AP.
        let ap = average_precision_at_k(&ranked(&["A", "B"]), &set(&["A", "C"]), 10);
        assert_eq!(ap, 1.0);
    }

    #[test]
    fn test_average_precision_no_hits_is_zero() {
        let ap = average_precision_at_k(&ranked(&["X", "Y"]), &set(&["A"]), 10);
        assert_eq!(ap, 0.0);
    }

    #[test]
    fn test_average_precision_respects_k() {
        // Hit beyond k does not count.
        let ap = average_precision_at_k(&ranked(&["X", "A"]), &set(&["A"]), 1);
        assert_eq!(ap, 0.0);
    }

    #[test]
    fn test_reciprocal_rank() {
        assert_eq!(reciprocal_rank(&ranked(&["A", "B"]), &set(&["A"])), 1.0);
        assert_eq!(reciprocal_rank(&ranked(&["X", "A"]), &set(&["A"])), 0.5);
        assert_eq!(reciprocal_rank(&ranked(&["X", "Y"]), &set(&["A"])), 0.0);
    }

    #[test]
    fn test_evaluate_averages_over_judged_queries() {
        let mut qrels = Qrels::new();
        qrels.insert("1".to_string(), set(&["A", "C"]));
        qrels.insert("2".to_string(), set(&["B"]));
        let mut run = Run::new();
        run.insert("1".to_string(), ranked(&["A", "B", "C"]));
        run.insert("2".to_string(), ranked(&["X"]));

        let report = evaluate(&qrels, &run, 10);
        assert_eq!(report.evaluated, 2);
        assert_eq!(report.missing_from_system, 0);
        assert!((report.mean_map - (0.8333 + 0.0) / 2.0).abs() < 1e-3);
        assert!((report.mean_mrr - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_evaluate_counts_missing_and_extra() {
        let mut qrels = Qrels::new();
        qrels.insert("1".to_string(), set(&["A"]));
        qrels.insert("2".to_string(), set(&["B"]));
        let mut run = Run::new();
        run.insert("1".to_string(), ranked(&["A"]));
        run.insert("9".to_string(), ranked(&["Z"]));

        let report = evaluate(&qrels, &run, 10);
        assert_eq!(report.evaluated, 1);
        assert_eq!(report.missing_from_system, 1);
        assert_eq!(report.extra_in_system, 1);
        // The missing query is reported but does not enter the mean.
        assert!((report.mean_map - 1.0).abs() < 1e-6);
        assert!((report.mean_mrr - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_load_qrels_skips_non_relevant() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1 0 2:255 1").unwrap();
        writeln!(f, "1 0 2:10 0").unwrap();
        writeln!(f, "2 0 -1 1").unwrap();
        let qrels = load_qrels(f.path()).unwrap();
        assert_eq!(qrels["1"], set(&["2:255"]));
        assert_eq!(qrels["2"], set(&["-1"]));
    }

    #[test]
    fn test_load_run_orders_by_rank_column() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "1\tQ0\tB\t2\t0.5\tsystem").unwrap();
        writeln!(f, "1\tQ0\tA\t1\t0.9\tsystem").unwrap();
        writeln!(f, "3\tQ0\tC\t1\t0.7\tsystem").unwrap();
        let run = load_run(f.path()).unwrap();
        assert_eq!(run["1"], ranked(&["A", "B"]));
        assert_eq!(run["3"], ranked(&["C"]));
    }
}
