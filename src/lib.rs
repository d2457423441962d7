//! kb-retriever - Knowledge base retrieval for retrieval-augmented generation
//!
//! Resolves a retriever node into a searchable knowledge base, turns ranked
//! hits into prompt context with citations, and rewrites the answer when
//! nothing relevant was found.
//!
//! # Architecture
//!
//! - **knowledge**: declarations and the store they are read from
//! - **embedding** / **vector_db** / **completion**: capability clients
//! - **rag**: resolver, retriever, context assembly, answer chain

pub mod errors;
pub mod cancel;
pub mod config;
pub mod telemetry;

pub mod knowledge;
pub mod embedding;
pub mod vector_db;
pub mod completion;

pub mod rag;

pub mod cli;

// Re-export commonly used types
pub use cancel::CallContext;
pub use errors::{ErrorKind, Result, RetrievalError};
pub use rag::{
    AnswerPipeline, AssembledContext, ContextAssembler, GroundedAnswer, Reference, Retriever,
    RetrieverCache, RetrieverResolver,
};
pub use vector_db::SearchHit;
