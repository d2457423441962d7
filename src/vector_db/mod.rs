// Vector index clients and the hits they return.
//
// Components:
// - Hit: ranked result with raw attribute bytes and their typed decode
// - Backend: closed backend variant, search trait, embedder-bound client
// - Chroma: REST client (first-class backend)
// - Qdrant: gRPC client

pub mod hit;
pub mod backend;
pub mod chroma;
pub mod qdrant;

pub use backend::{ChromaParams, QdrantParams, SimilaritySearch, VectorBackend, VectorStoreClient};
pub use chroma::ChromaIndex;
pub use hit::{unquote, HitAttributes, SearchHit};
pub use qdrant::QdrantIndex;
