// Embedding capability: query text to vector
pub mod engine;

pub use engine::{embedder_from_decl, Embedder, OllamaEmbedder, OpenAiEmbedder};
