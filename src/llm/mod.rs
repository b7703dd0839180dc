//! Language model access for planning, ranking, summarisation, and synthesis.
//!
//! Every stage of the pipeline talks to one OpenAI-compatible
//! chat-completions endpoint through the [`GenerationBackend`] trait, so
//! tests can substitute a scripted backend and the provider can be swapped
//! without touching stage code. Calls are non-streaming: stages consume
//! whole responses, never token deltas.

pub mod backend;
pub mod openai;

pub use backend::{GenerationBackend, GenerationRequest};
pub use openai::{OpenAiClient, OpenAiConfig};
