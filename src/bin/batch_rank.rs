//! Rank a batch of query records against the corpus and write a ranked run
//! file. Each input line is one JSON query record (with optional paraphrase
//! variants); each query contributes one block of tab-separated rows:
//!
//!   qid  Q0  document_number  rank  score  tag
//!
//! A query whose variants all fail still gets a "-1" sentinel row, so the
//! output always covers every input query.
//!
//! Usage: batch-rank <queries.jsonl> <output.tsv>

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use verse_search::config::Config;
use verse_search::encoder::EncoderHandle;
use verse_search::models::QueryRecord;
use verse_search::search::aggregate;
use verse_search::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (input_path, output_path) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (PathBuf::from(i), PathBuf::from(o)),
        _ => {
            eprintln!("Usage: batch-rank <queries.jsonl> <output.tsv>");
            std::process::exit(2);
        }
    };

    let config = Config::from_env();
    let encoder_id = config.batch_encoder.clone();
    let pool_k = config.retrieve_top_k;
    let state = AppState::new(config)?;

    let handle = state
        .registry
        .get_or_initialize(&encoder_id)
        .await
        .with_context(|| format!("Failed to initialize encoder {encoder_id}"))?;
    let handle = match handle {
        EncoderHandle::Semantic(h) => h,
        EncoderHandle::Lexical(_) => {
            anyhow::bail!("Encoder {encoder_id} has no embeddings; pick a semantic backend")
        }
    };

    let input = std::fs::read_to_string(&input_path)
        .with_context(|| format!("Failed to read queries file {}", input_path.display()))?;
    let mut output = std::fs::File::create(&output_path)
        .with_context(|| format!("Failed to create output file {}", output_path.display()))?;

    let mut ranked_queries = 0usize;
    for (line_no, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: QueryRecord = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!("Skipping malformed record on line {}: {err}", line_no + 1);
                continue;
            }
        };

        let qid = record.qid_str();
        let entries = aggregate::aggregate_record(&handle, &state.corpus, &record, pool_k).await;
        for entry in &entries {
            writeln!(
                output,
                "{qid}\tQ0\t{}\t{}\t{}\t{encoder_id}",
                entry.document_number, entry.rank, entry.score
            )?;
        }
        ranked_queries += 1;
        if ranked_queries % 25 == 0 {
            tracing::info!("Ranked {ranked_queries} queries");
        }
    }

    tracing::info!(
        "Wrote rankings for {ranked_queries} queries to {}",
        output_path.display()
    );
    Ok(())
}
