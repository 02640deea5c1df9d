//! # verse-search
//!
//! A semantic search and answer-ranking service over a fixed corpus of
//! Quranic verse translations. Queries arrive in the corpus language (or as
//! paraphrase variants produced by upstream batch jobs) and are answered
//! with ranked verse references.
//!
//! ## Architecture
//!
//! Every semantic backend runs the same two-stage pipeline:
//!
//! ```text
//!            ┌─────────────┐
//!            │    Query     │
//!            └──────┬───────┘
//!                   │ embed
//!                   ▼
//!       ┌───────────────────────┐
//!       │  Vector Retrieval     │
//!       │  cosine vs corpus     │
//!       │  keep top 30          │
//!       └───────────┬───────────┘
//!                   │
//!                   ▼
//!       ┌───────────────────────┐
//!       │  Rerank               │
//!       │  cross-encoder or     │
//!       │  LLM -5..5 judgment   │
//!       └───────────┬───────────┘
//!                   │
//!                   ▼
//!       ┌───────────────────────┐
//!       │  Fusion / Thresholds  │
//!       │  dedup, cut to 5      │
//!       │  "-1" = no answer     │
//!       └───────────────────────┘
//! ```
//!
//! Batch ranking additionally runs the pipeline once per query variant and
//! merges the lists by maximum score ([`search::aggregate`]).
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration: data dir, backends, LLM/reranker endpoints
//! - [`models`] - Request/response types and batch query records
//! - [`corpus`] - The immutable verse corpus and embedding-file loading
//! - [`text`] - Query/passage normalization shared by all backends
//! - [`encoder`] - Encoder backends and the lazy registry that caches them
//! - [`search`] - Retrieval, rerank, fusion, and multi-variant aggregation
//! - [`eval`] - MAP@k / MRR evaluation of ranked runs against gold judgments
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod config;
pub mod corpus;
pub mod encoder;
pub mod eval;
pub mod models;
pub mod search;
pub mod state;
pub mod text;
