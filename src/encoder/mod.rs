//! Encoder backends: interchangeable models behind one capability set.
//!
//! A backend can embed text into a fixed-length vector and, when reranking
//! is available, score (query, passage) pairs. Concrete backends differ in
//! the scale of their rerank scores, so each declares a [`ScoreFamily`]
//! that the fusion stage uses to pick its threshold profile.

pub mod factory;
pub mod lexical;
pub mod registry;
pub mod transformer;

mod llm;

pub use factory::ConfigBackendFactory;
pub use lexical::LexicalIndex;
pub use llm::LlmBackend;
pub use registry::{BackendFactory, EncoderRegistry, RegistryError};
pub use transformer::TransformerBackend;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Which scale a backend's rerank scores live on. The fusion policy is
/// parameterized per family; the two scales are deliberately not unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFamily {
    /// Raw scores from a learned cross-encoder, used as returned.
    CrossEncoder,
    /// LLM similarity judgments, native -5..5, normalized to 0..1.
    LlmJudgment,
}

#[async_trait]
pub trait EncoderBackend: Send + Sync {
    fn family(&self) -> ScoreFamily;

    /// Whether `rerank` is usable. Backends without a reranker still serve
    /// vector-only search.
    fn can_rerank(&self) -> bool;

    /// Embed one text into a fixed-length vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Score each passage against the query, one score per passage, on the
    /// scale declared by `family()`.
    async fn rerank(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;
}

/// A fully initialized semantic backend together with the corpus embeddings
/// it retrieves against. Embeddings are aligned with the corpus by index.
pub struct SemanticHandle {
    pub backend: Arc<dyn EncoderBackend>,
    pub embeddings: Arc<Vec<Vec<f32>>>,
}

/// Cache entry owned by the registry. Tagged by the search path it serves:
/// semantic backends run the retrieve-rerank pipeline, the lexical backend
/// matches against the gold question bank directly.
#[derive(Clone)]
pub enum EncoderHandle {
    Semantic(Arc<SemanticHandle>),
    Lexical(Arc<LexicalIndex>),
}

// Manual impl: the trait object behind SemanticHandle has no Debug bound.
impl std::fmt::Debug for EncoderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EncoderHandle::Semantic(h) => f
                .debug_struct("Semantic")
                .field("family", &h.backend.family())
                .field("embeddings", &h.embeddings.len())
                .finish(),
            EncoderHandle::Lexical(index) => f
                .debug_struct("Lexical")
                .field("questions", &index.question_count())
                .finish(),
        }
    }
}
