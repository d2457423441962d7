// Backend dispatch for vector indexes, decided once at construction
use async_trait::async_trait;
use std::sync::Arc;

use crate::cancel::CallContext;
use crate::embedding::Embedder;
use crate::errors::{Result, RetrievalError};
use crate::knowledge::{DistanceFunction, VectorIndexDecl};
use crate::vector_db::hit::SearchHit;

/// Nearest-neighbour search over one collection of a vector index
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Ranked hits for `vector`, best first. `score_threshold` is applied
    /// the way the backend defines it.
    async fn similarity_search(
        &self,
        ctx: &CallContext,
        vector: &[f32],
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>>;

    /// Collection the client is bound to
    fn namespace(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromaParams {
    pub url: String,
    pub distance_function: DistanceFunction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QdrantParams {
    pub url: String,
    pub content_key: String,
}

/// Closed set of vector index backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorBackend {
    Chroma(ChromaParams),
    Qdrant(QdrantParams),
    Unsupported(String),
}

impl VectorBackend {
    /// Classify a declaration. Conflicting or incomplete backend sections
    /// are configuration errors; an unrecognised type is `Unsupported`.
    pub fn from_decl(decl: &VectorIndexDecl) -> Result<Self> {
        let url = decl.endpoint.url.clone();
        let declared = decl.declared_type.as_deref();

        match (&decl.chroma, &decl.qdrant) {
            (Some(_), Some(_)) => Err(RetrievalError::Configuration(format!(
                "vectorstore {}: both chroma and qdrant sections are set",
                decl.name
            ))),
            (Some(chroma), None) if declared.map_or(true, |t| t == "chroma") => {
                Ok(VectorBackend::Chroma(ChromaParams {
                    url,
                    distance_function: chroma.distance_function,
                }))
            }
            (None, Some(qdrant)) if declared.map_or(true, |t| t == "qdrant") => {
                Ok(VectorBackend::Qdrant(QdrantParams {
                    url,
                    content_key: qdrant.content_key.clone(),
                }))
            }
            (Some(_), None) | (None, Some(_)) => Err(RetrievalError::Configuration(format!(
                "vectorstore {}: type {} does not match its {} section",
                decl.name,
                declared.unwrap_or_default(),
                if decl.chroma.is_some() { "chroma" } else { "qdrant" }
            ))),
            (None, None) => match declared {
                Some(t @ ("chroma" | "qdrant")) => Err(RetrievalError::Configuration(format!(
                    "vectorstore {}: type {} has no {} section",
                    decl.name, t, t
                ))),
                _ => Ok(VectorBackend::Unsupported(decl.backend_type().to_string())),
            },
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, VectorBackend::Unsupported(_))
    }

    pub fn type_name(&self) -> &str {
        match self {
            VectorBackend::Chroma(_) => "chroma",
            VectorBackend::Qdrant(_) => "qdrant",
            VectorBackend::Unsupported(name) => name,
        }
    }
}

/// A similarity search bound to the embedder that produced its vectors
#[derive(Clone)]
pub struct VectorStoreClient {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilaritySearch>,
}

impl VectorStoreClient {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn SimilaritySearch>) -> Self {
        Self { embedder, index }
    }

    /// Embed `query` and search the bound collection
    pub async fn search(
        &self,
        ctx: &CallContext,
        query: &str,
        k: usize,
        score_threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>> {
        let vector = self.embedder.embed_query(ctx, query).await?;
        self.index
            .similarity_search(ctx, &vector, k, score_threshold)
            .await
    }

    pub fn namespace(&self) -> &str {
        self.index.namespace()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }
}

impl std::fmt::Debug for VectorStoreClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStoreClient")
            .field("embedder", &self.embedder.model())
            .field("namespace", &self.index.namespace())
            .finish()
    }
}
