//! Search orchestrator: concurrent queries, ordering, deduplication.
//!
//! This module fans one query out to the configured engines
//! concurrently, merges the lists deterministically, deduplicates by
//! normalised URL (first occurrence wins), and returns an ordered,
//! truncated result set.

pub mod dedup;
pub mod scoring;
pub mod search;
pub mod url_normalize;
