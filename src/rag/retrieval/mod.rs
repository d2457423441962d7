// Knowledge-base retriever module
pub mod engine;

pub use engine::{KnowledgeBaseBinding, Retriever};
