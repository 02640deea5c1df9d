pub mod aggregate;
pub mod fusion;
pub mod pipeline;
pub mod rerank;
pub mod retrieve;
