//! Score a ranked run file against gold relevance judgments.
//!
//! Usage: evaluate <qrels_file> <run_file>

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use verse_search::eval;

const K: usize = 10;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (qrels_path, run_path) = match (args.next(), args.next()) {
        (Some(q), Some(r)) => (PathBuf::from(q), PathBuf::from(r)),
        _ => {
            eprintln!("Usage: evaluate <qrels_file> <run_file>");
            std::process::exit(2);
        }
    };

    let qrels = eval::load_qrels(&qrels_path)?;
    let run = eval::load_run(&run_path)?;

    let mut qids: Vec<&String> = qrels.keys().collect();
    qids.sort();
    for qid in qids {
        let relevant = &qrels[qid];
        match run.get(qid) {
            Some(ranked) => println!(
                "{qid}\tAP@{K}={:.4}\tRR={:.4}",
                eval::average_precision_at_k(ranked, relevant, K),
                eval::reciprocal_rank(ranked, relevant),
            ),
            None => println!("{qid}\tmissing from run"),
        }
    }

    let report = eval::evaluate(&qrels, &run, K);
    println!("Queries evaluated: {}", report.evaluated);
    if report.missing_from_system > 0 {
        println!("Missing from run:  {}", report.missing_from_system);
    }
    if report.extra_in_system > 0 {
        println!("Unjudged in run:   {}", report.extra_in_system);
    }
    println!("MAP@{K}: {:.4}", report.mean_map);
    println!("MRR:    {:.4}", report.mean_mrr);
    Ok(())
}
