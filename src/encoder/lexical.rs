//! Lexical question-bank backend.
//!
//! Matches queries against the gold question bank with character n-gram
//! TF-IDF cosine similarity (n = 3..5, word-boundary padded), then reports
//! each matched question's gold verses. No corpus embeddings involved.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::models::QuestionHit;
use crate::text::normalize;

#[derive(Debug, Clone)]
pub struct Question {
    pub qid: String,
    pub text: String,
}

pub struct LexicalIndex {
    questions: Vec<Question>,
    /// qid -> gold verse document_numbers
    gold: HashMap<String, Vec<String>>,
    vocab: HashMap<String, u32>,
    idf: Vec<f32>,
    /// L2-normalized sparse TF-IDF vector per question
    vectors: Vec<HashMap<u32, f32>>,
}

impl LexicalIndex {
    pub fn new(questions: Vec<Question>, gold: HashMap<String, Vec<String>>) -> Self {
        let docs: Vec<HashMap<String, usize>> = questions
            .iter()
            .map(|q| ngram_counts(&normalize(&q.text)))
            .collect();

        let mut df: HashMap<String, usize> = HashMap::new();
        for counts in &docs {
            for gram in counts.keys() {
                *df.entry(gram.clone()).or_insert(0) += 1;
            }
        }

        let mut vocab = HashMap::new();
        let mut idf = Vec::new();
        let n_docs = docs.len() as f32;
        for (gram, doc_freq) in df {
            let id = vocab.len() as u32;
            // Smoothed idf so unseen-in-few-docs grams are not infinite.
            idf.push(((1.0 + n_docs) / (1.0 + doc_freq as f32)).ln() + 1.0);
            vocab.insert(gram, id);
        }

        let vectors = docs
            .iter()
            .map(|counts| vectorize(counts, &vocab, &idf))
            .collect();

        Self {
            questions,
            gold,
            vocab,
            idf,
            vectors,
        }
    }

    /// Load the question bank (`qid \t question` TSV) and its gold judgments
    /// (`qid iteration document_number relevance`, whitespace-separated).
    pub fn load(question_path: &Path, qrels_path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(question_path)
            .with_context(|| format!("Failed to read question bank {}", question_path.display()))?;

        let mut questions = Vec::new();
        for line in data.lines() {
            if let Some((qid, text)) = line.split_once('\t') {
                questions.push(Question {
                    qid: qid.trim().to_string(),
                    text: text.trim().to_string(),
                });
            }
        }

        let data = std::fs::read_to_string(qrels_path)
            .with_context(|| format!("Failed to read gold judgments {}", qrels_path.display()))?;

        let mut gold: HashMap<String, Vec<String>> = HashMap::new();
        for line in data.lines() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                continue;
            }
            let relevance: i64 = parts[3].parse().unwrap_or(0);
            if relevance > 0 && parts[2] != "-1" {
                gold.entry(parts[0].to_string())
                    .or_default()
                    .push(parts[2].to_string());
            }
        }

        tracing::info!(
            "Loaded {} questions and judgments for {} from question bank",
            questions.len(),
            gold.len(),
        );
        Ok(Self::new(questions, gold))
    }

    /// Top-k gold questions by TF-IDF cosine similarity, each with its
    /// judged-relevant verses.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<QuestionHit> {
        let counts = ngram_counts(&normalize(query));
        let query_vec = vectorize(&counts, &self.vocab, &self.idf);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, sparse_dot(&query_vec, v)))
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(i, similarity)| {
                let q = &self.questions[i];
                QuestionHit {
                    qid: q.qid.clone(),
                    question: q.text.clone(),
                    similarity,
                    verses: self.gold.get(&q.qid).cloned().unwrap_or_default(),
                }
            })
            .collect()
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Character n-gram counts (n = 3..5) per word, each word padded with a
/// leading and trailing space so boundary grams are distinct.
fn ngram_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for word in text.split_whitespace() {
        let padded: Vec<char> = format!(" {word} ").chars().collect();
        for n in 3..=5usize {
            if padded.len() < n {
                continue;
            }
            for window in padded.windows(n) {
                let gram: String = window.iter().collect();
                *counts.entry(gram).or_insert(0) += 1;
            }
        }
    }
    counts
}

fn vectorize(
    counts: &HashMap<String, usize>,
    vocab: &HashMap<String, u32>,
    idf: &[f32],
) -> HashMap<u32, f32> {
    let mut vec: HashMap<u32, f32> = HashMap::new();
    for (gram, count) in counts {
        if let Some(&id) = vocab.get(gram) {
            vec.insert(id, *count as f32 * idf[id as usize]);
        }
    }
    let norm: f32 = vec.values().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.values_mut() {
            *v /= norm;
        }
    }
    vec
}

fn sparse_dot(a: &HashMap<u32, f32>, b: &HashMap<u32, f32>) -> f32 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(id, v)| large.get(id).map(|w| v * w))
        .sum()
}
