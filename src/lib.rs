//! Scry: deep web research pipeline.
//!
//! This crate turns a research topic into a cited Markdown answer:
//! Topic → Sub-queries → Search queries → Web search → Rank → Fetch →
//! Summarise → Rank → Answer
//!
//! # Architecture
//!
//! The pipeline is built from independent stages sharing an on-disk cache:
//! - **Planning**: Decomposes the topic into sub-queries and per-language
//!   search queries via an OpenAI-compatible provider
//! - **Search**: Executes the queries concurrently through `scry-search`
//!   (SearXNG or DuckDuckGo) and deduplicates by normalized URL
//! - **Ranking**: Scores snippets and summaries for topic relevance with
//!   the same provider
//! - **Documents**: Fetches the top pages (direct or through a reader
//!   proxy) and condenses each into a summary
//! - **Synthesis**: Writes the final answer with inline citations, falling
//!   back to concatenated summaries when generation fails
//!
//! Every stage persists its output under the topic's cache directory, so
//! an interrupted run resumes where it stopped.

pub mod cache;
pub mod config;
pub mod docs;
pub mod error;
pub mod executor;
pub mod gate;
pub mod llm;
pub mod pipeline;
pub mod planner;
pub mod rank;
pub mod scry_dirs;
pub mod synthesize;

pub use config::ScryConfig;
pub use error::{Result, ScryError};
pub use pipeline::{Pipeline, RunReport, StageFailure};
