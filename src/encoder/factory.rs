//! Builds concrete backends from configuration.

use std::sync::Arc;

use crate::config::{BackendKind, BackendSpec, Config};
use crate::corpus::{load_embeddings, Corpus};
use crate::encoder::registry::{BackendFactory, RegistryError};
use crate::encoder::transformer::RerankerEndpoint;
use crate::encoder::{EncoderHandle, LexicalIndex, LlmBackend, SemanticHandle, TransformerBackend};

pub struct ConfigBackendFactory {
    config: Config,
    corpus: Arc<Corpus>,
    client: reqwest::Client,
}

impl ConfigBackendFactory {
    pub fn new(config: Config, corpus: Arc<Corpus>, client: reqwest::Client) -> Self {
        Self {
            config,
            corpus,
            client,
        }
    }

    fn unavailable(&self, id: &str, reason: impl Into<String>) -> RegistryError {
        RegistryError::BackendUnavailable {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    fn load_backend_embeddings(
        &self,
        id: &str,
        spec: &BackendSpec,
    ) -> Result<Arc<Vec<Vec<f32>>>, RegistryError> {
        let file = spec
            .embedding_file
            .as_ref()
            .ok_or_else(|| self.unavailable(id, "no embedding file configured"))?;
        let path = self.config.data_dir.join(file);
        let embeddings = load_embeddings(&path, self.corpus.len())
            .map_err(|e| self.unavailable(id, format!("{e:#}")))?;
        Ok(Arc::new(embeddings))
    }
}

impl BackendFactory for ConfigBackendFactory {
    fn known(&self, backend_id: &str) -> bool {
        self.config.backends.contains_key(backend_id)
    }

    fn build(&self, backend_id: &str) -> Result<EncoderHandle, RegistryError> {
        let spec = self
            .config
            .backends
            .get(backend_id)
            .ok_or_else(|| RegistryError::UnsupportedBackend(backend_id.to_string()))?;

        match spec.kind {
            BackendKind::Transformer => {
                let embeddings = self.load_backend_embeddings(backend_id, spec)?;
                let reranker = match (&self.config.reranker.base_url, &spec.rerank_model) {
                    (Some(base_url), Some(model)) => Some(RerankerEndpoint {
                        base_url: base_url.clone(),
                        model: model.clone(),
                        timeout_secs: self.config.reranker.timeout_secs,
                    }),
                    _ => {
                        tracing::warn!(
                            "No reranker configured for {backend_id}, serving vector-only results"
                        );
                        None
                    }
                };
                let backend = TransformerBackend::new(
                    self.client.clone(),
                    self.config.llm.base_url.clone(),
                    self.config.llm.api_key.clone(),
                    spec.embedding_model
                        .clone()
                        .unwrap_or_else(|| self.config.llm.embedding_model.clone()),
                    reranker,
                );
                Ok(EncoderHandle::Semantic(Arc::new(SemanticHandle {
                    backend: Arc::new(backend),
                    embeddings,
                })))
            }
            BackendKind::Llm => {
                let api_key = self
                    .config
                    .llm
                    .api_key
                    .clone()
                    .ok_or_else(|| self.unavailable(backend_id, "LLM_API_KEY not set"))?;
                let embeddings = self.load_backend_embeddings(backend_id, spec)?;
                let backend = LlmBackend::new(
                    self.client.clone(),
                    self.config.llm.base_url.clone(),
                    api_key,
                    self.config.llm.chat_model.clone(),
                    spec.embedding_model
                        .clone()
                        .unwrap_or_else(|| self.config.llm.embedding_model.clone()),
                );
                Ok(EncoderHandle::Semantic(Arc::new(SemanticHandle {
                    backend: Arc::new(backend),
                    embeddings,
                })))
            }
            BackendKind::Lexical => {
                let question_file = spec
                    .question_file
                    .as_ref()
                    .ok_or_else(|| self.unavailable(backend_id, "no question bank configured"))?;
                let qrels_file = spec
                    .qrels_file
                    .as_ref()
                    .ok_or_else(|| self.unavailable(backend_id, "no gold judgments configured"))?;
                let index = LexicalIndex::load(
                    &self.config.data_dir.join(question_file),
                    &self.config.data_dir.join(qrels_file),
                )
                .map_err(|e| self.unavailable(backend_id, format!("{e:#}")))?;
                Ok(EncoderHandle::Lexical(Arc::new(index)))
            }
        }
    }
}
