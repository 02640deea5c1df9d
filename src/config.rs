use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where the corpus, embedding files and question bank live
    pub data_dir: PathBuf,
    /// Server bind address
    pub bind_addr: String,
    /// Corpus JSONL file name (inside data_dir)
    pub corpus_file: String,
    /// LLM provider configuration (embeddings + similarity judgments)
    pub llm: LlmConfig,
    /// Cross-encoder reranker sidecar configuration
    pub reranker: RerankerConfig,
    /// Known encoder backends, keyed by the id clients pass in requests
    pub backends: HashMap<String, BackendSpec>,
    /// Candidate pool size fetched from the retrieval stage before reranking
    pub retrieve_top_k: usize,
    /// Backend id used by the batch-rank binary
    pub batch_encoder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the OpenAI-compatible API
    pub base_url: String,
    /// Model name for similarity-judgment prompts
    pub chat_model: String,
    /// Default model name for embeddings
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
}

/// Configuration for the cross-encoder reranker sidecar (e.g. a llama-server
/// or TEI instance exposing `/v1/rerank`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RerankerConfig {
    /// Base URL for the reranker API. If None, transformer backends run
    /// without a rerank stage (vector order only).
    pub base_url: Option<String>,
    /// Request timeout in seconds (capped at 30).
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Bi-encoder embeddings + learned cross-encoder rescoring
    Transformer,
    /// Embeddings + LLM similarity-judgment rescoring on a -5..5 scale
    Llm,
    /// Char n-gram TF-IDF over the gold question bank, no embeddings
    Lexical,
}

/// Static description of one encoder backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSpec {
    pub kind: BackendKind,
    /// Precomputed corpus embeddings (inside data_dir); required for
    /// Transformer and Llm kinds.
    pub embedding_file: Option<String>,
    /// Embedding model name sent to the embeddings API; falls back to
    /// `LlmConfig::embedding_model` when None.
    pub embedding_model: Option<String>,
    /// Cross-encoder model name sent to the reranker sidecar.
    pub rerank_model: Option<String>,
    /// Question bank TSV (`qid \t question`) for the lexical kind.
    pub question_file: Option<String>,
    /// Gold judgment file mapping questions to verses, for the lexical kind.
    pub qrels_file: Option<String>,
}

impl BackendSpec {
    fn transformer(embedding_file: &str, embedding_model: &str, rerank_model: &str) -> Self {
        Self {
            kind: BackendKind::Transformer,
            embedding_file: Some(embedding_file.to_string()),
            embedding_model: Some(embedding_model.to_string()),
            rerank_model: Some(rerank_model.to_string()),
            question_file: None,
            qrels_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut backends = HashMap::new();
        backends.insert(
            "indo-sbert".to_string(),
            BackendSpec::transformer(
                "embedding_corpus_indo_sbert.json",
                "firqaaa/indo-sentence-bert-base",
                "Rifky/Indobert-QA",
            ),
        );
        backends.insert(
            "indobert".to_string(),
            BackendSpec::transformer(
                "embedding_corpus_indobert.json",
                "indobenchmark/indobert-base-p1",
                "indobenchmark/indobert-base-p2",
            ),
        );
        backends.insert(
            "distilbert-tas-b".to_string(),
            BackendSpec::transformer(
                "embedding_corpus_distilbert.json",
                "msmarco-distilbert-base-tas-b",
                "cross-encoder/ms-marco-MiniLM-L-6-v2",
            ),
        );
        backends.insert(
            "arabert".to_string(),
            BackendSpec::transformer(
                "embedding_corpus_arabert.json",
                "aubmindlab/bert-base-arabert",
                "aubmindlab/araelectra-base-discriminator",
            ),
        );
        backends.insert(
            "openai-ada".to_string(),
            BackendSpec {
                kind: BackendKind::Llm,
                embedding_file: Some("embedding_corpus_ada.json".to_string()),
                embedding_model: Some("text-embedding-ada-002".to_string()),
                rerank_model: None,
                question_file: None,
                qrels_file: None,
            },
        );
        backends.insert(
            "ayatec".to_string(),
            BackendSpec {
                kind: BackendKind::Lexical,
                embedding_file: None,
                embedding_model: None,
                rerank_model: None,
                question_file: Some("ayatec_questions.tsv".to_string()),
                qrels_file: Some("ayatec_qrels.gold".to_string()),
            },
        );

        Self {
            data_dir: PathBuf::from("./data"),
            bind_addr: "127.0.0.1:8001".to_string(),
            corpus_file: "verse_corpus.jsonl".to_string(),
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            backends,
            retrieve_top_k: 30,
            batch_encoder: "openai-ada".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            chat_model: "gpt-3.5-turbo-instruct".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            api_key: None,
        }
    }
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("VERSE_SEARCH_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(addr) = std::env::var("VERSE_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(file) = std::env::var("VERSE_SEARCH_CORPUS_FILE") {
            config.corpus_file = file;
        }
        if let Ok(url) = std::env::var("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Ok(model) = std::env::var("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Ok(model) = std::env::var("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        if let Ok(key) = std::env::var("LLM_API_KEY") {
            config.llm.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RERANKER_BASE_URL") {
            config.reranker.base_url = Some(url);
        }
        if let Ok(val) = std::env::var("RERANKER_TIMEOUT_SECS") {
            if let Ok(v) = val.parse::<u64>() {
                config.reranker.timeout_secs = v.min(30); // Cap at 30s
            }
        }
        if let Ok(val) = std::env::var("VERSE_SEARCH_RETRIEVE_TOP_K") {
            if let Ok(v) = val.parse::<usize>() {
                config.retrieve_top_k = v.max(1);
            }
        }
        if let Ok(id) = std::env::var("VERSE_SEARCH_BATCH_ENCODER") {
            config.batch_encoder = id;
        }

        config
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.data_dir.join(&self.corpus_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_backends_cover_all_kinds() {
        let config = Config::default();
        let kinds: Vec<BackendKind> = config.backends.values().map(|b| b.kind).collect();
        assert!(kinds.contains(&BackendKind::Transformer));
        assert!(kinds.contains(&BackendKind::Llm));
        assert!(kinds.contains(&BackendKind::Lexical));
    }

    #[test]
    fn test_transformer_backends_have_embeddings_and_reranker() {
        let config = Config::default();
        for spec in config.backends.values() {
            if spec.kind == BackendKind::Transformer {
                assert!(spec.embedding_file.is_some());
                assert!(spec.rerank_model.is_some());
            }
        }
    }
}
