// Downstream completion step
pub mod client;

pub use client::{render_prompt, ChainValues, CompletionChain, OllamaCompletion, DEFAULT_OUTPUT_KEY};
