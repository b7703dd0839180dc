//! Search engine implementations.
//!
//! Each module provides a struct implementing
//! [`crate::engine::SearchEngineTrait`] for one provider: the SearXNG
//! JSON API and the DuckDuckGo HTML endpoint.

pub mod duckduckgo;
pub mod searxng;

pub use duckduckgo::DuckDuckGoEngine;
pub use searxng::SearxngEngine;
