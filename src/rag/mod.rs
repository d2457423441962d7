// Retrieval-augmented answering over a configured knowledge base
//
// Components:
// - Resolver: retriever node reference -> ready Retriever (with resolve-once cache)
// - Retrieval: Retriever search and the pipeline-node seam
// - Context: join ranked hits into prompt text plus citations
// - Chain: completion step composed with context assembly and fallback rewrite
// - Pipeline: end-to-end question -> grounded answer

pub mod node;
pub mod retrieval;
pub mod resolver;
pub mod context;
pub mod chain;
pub mod pipeline;

// Re-export key types
pub use chain::{apply_fallback, ChainOutcome, GroundedAnswerChain};
pub use context::{AssembledContext, ContextAssembler, Reference};
pub use node::{NodeArgs, NodeValue, PipelineNode, RETRIEVER_ARG_KEY};
pub use pipeline::{AnswerPipeline, GroundedAnswer};
pub use resolver::{ClientFactory, HttpClientFactory, RetrieverCache, RetrieverResolver};
pub use retrieval::{KnowledgeBaseBinding, Retriever};
