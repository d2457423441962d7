// Knowledge base declarations and the store they are read from.
//
// Components:
// - Types: knowledge base, embedder, vector index and retriever node declarations
// - Store: read-only lookup contract plus a manifest-backed implementation

pub mod types;
pub mod store;

pub use store::{ConfigStore, Manifest, StaticConfigStore};
pub use types::{
    ChromaSpec, DistanceFunction, EmbedderDecl, Endpoint, KnowledgeBaseDecl, QdrantSpec,
    RetrieverDecl, TypedObjectReference, VectorIndexDecl,
};
