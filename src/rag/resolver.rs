//! Retriever resolution
//!
//! Turns a retriever node reference into a ready [`Retriever`]: reads the
//! node and its knowledge base, builds the embedder and a vector index
//! client bound to the knowledge base's collection. Single attempt, no
//! retries; callers decide whether to resolve again.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

use crate::cancel::CallContext;
use crate::embedding::{embedder_from_decl, Embedder};
use crate::errors::{Result, ResultExt, RetrievalError};
use crate::knowledge::{ConfigStore, EmbedderDecl, RetrieverDecl, TypedObjectReference};
use crate::rag::retrieval::{KnowledgeBaseBinding, Retriever};
use crate::vector_db::{
    ChromaIndex, QdrantIndex, SimilaritySearch, VectorBackend, VectorStoreClient,
};

/// Builds capability clients from resolved declarations
#[async_trait]
pub trait ClientFactory: Send + Sync {
    fn embedder(&self, decl: &EmbedderDecl) -> Result<Arc<dyn Embedder>>;

    /// Whether `connect_index` can handle this backend
    fn supports(&self, backend: &VectorBackend) -> bool;

    /// Connect to the collection `namespace` of a supported backend
    async fn connect_index(
        &self,
        ctx: &CallContext,
        backend: &VectorBackend,
        namespace: &str,
    ) -> Result<Arc<dyn SimilaritySearch>>;
}

/// Network clients for the built-in embedder and backend types
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: Client,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ClientFactory for HttpClientFactory {
    fn embedder(&self, decl: &EmbedderDecl) -> Result<Arc<dyn Embedder>> {
        embedder_from_decl(decl, self.http.clone())
    }

    fn supports(&self, backend: &VectorBackend) -> bool {
        backend.is_supported()
    }

    async fn connect_index(
        &self,
        ctx: &CallContext,
        backend: &VectorBackend,
        namespace: &str,
    ) -> Result<Arc<dyn SimilaritySearch>> {
        match backend {
            VectorBackend::Chroma(params) => Ok(Arc::new(
                ChromaIndex::connect(ctx, self.http.clone(), params, namespace).await?,
            )),
            VectorBackend::Qdrant(params) => {
                Ok(Arc::new(QdrantIndex::connect(ctx, params, namespace).await?))
            }
            VectorBackend::Unsupported(name) => {
                Err(RetrievalError::UnsupportedBackend(name.clone()))
            }
        }
    }
}

/// Validated numeric parameters of a retriever node
fn search_parameters(decl: &RetrieverDecl) -> Result<(usize, f32)> {
    let num_documents = decl.num_documents.ok_or_else(|| {
        RetrievalError::Configuration(format!("retriever {}: num_documents not set", decl.name))
    })?;
    if num_documents == 0 {
        return Err(RetrievalError::Configuration(format!(
            "retriever {}: num_documents must be at least 1",
            decl.name
        )));
    }

    let score_threshold = decl.score_threshold.ok_or_else(|| {
        RetrievalError::Configuration(format!("retriever {}: score_threshold not set", decl.name))
    })?;
    if !(0.0..=1.0).contains(&score_threshold) {
        return Err(RetrievalError::Configuration(format!(
            "retriever {}: score_threshold {} must be between 0 and 1",
            decl.name, score_threshold
        )));
    }

    Ok((num_documents, score_threshold))
}

/// Resolves retriever nodes against a config store
pub struct RetrieverResolver {
    store: Arc<dyn ConfigStore>,
    factory: Arc<dyn ClientFactory>,
    app_namespace: String,
}

impl RetrieverResolver {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        factory: Arc<dyn ClientFactory>,
        app_namespace: impl Into<String>,
    ) -> Self {
        Self {
            store,
            factory,
            app_namespace: app_namespace.into(),
        }
    }

    pub fn app_namespace(&self) -> &str {
        &self.app_namespace
    }

    pub async fn resolve(&self, ctx: &CallContext, node: &TypedObjectReference) -> Result<Retriever> {
        let ns = node.namespace_or(&self.app_namespace).to_string();

        let decl = ctx
            .run(self.store.get_retriever(&ns, &node.name))
            .await
            .with_context(|| format!("can't find the retriever {}/{}", ns, node.name))?;
        let (num_documents, score_threshold) = search_parameters(&decl)?;

        let kb_ref = &decl.knowledge_base;
        let kb_ns = kb_ref.namespace_or(&ns);
        let kb = ctx
            .run(self.store.get_knowledge_base(kb_ns, &kb_ref.name))
            .await
            .with_context(|| format!("retriever {}: load knowledge base", decl.name))?;
        let kb_id = format!("{}/{}", kb.namespace, kb.name);

        let (embedder_ref, vs_ref) = match (&kb.embedder, &kb.vector_store) {
            (Some(e), Some(v)) => (e.clone(), v.clone()),
            _ => {
                return Err(RetrievalError::Configuration(format!(
                    "knowledge base {}: embedder or vectorstore not set",
                    kb.name
                )))
            }
        };

        // independent reads
        let (embedder_decl, vs_decl) = tokio::try_join!(
            async {
                ctx.run(
                    self.store
                        .get_embedder(embedder_ref.namespace_or(&kb.namespace), &embedder_ref.name),
                )
                .await
                .with_context(|| format!("knowledge base {}: load embedder", kb_id))
            },
            async {
                ctx.run(
                    self.store
                        .get_vector_index(vs_ref.namespace_or(&kb.namespace), &vs_ref.name),
                )
                .await
                .with_context(|| format!("knowledge base {}: load vectorstore", kb_id))
            },
        )?;

        let embedder = self
            .factory
            .embedder(&embedder_decl)
            .with_context(|| format!("knowledge base {}: create embedder", kb_id))?;

        let backend = VectorBackend::from_decl(&vs_decl)
            .with_context(|| format!("knowledge base {}", kb_id))?;
        if !self.factory.supports(&backend) {
            return Err(RetrievalError::UnsupportedBackend(backend.type_name().to_string())
                .context(format!("knowledge base {}", kb_id)));
        }

        let index_namespace = kb.vector_store_collection_name();
        let index = self
            .factory
            .connect_index(ctx, &backend, &index_namespace)
            .await
            .with_context(|| format!("knowledge base {}: connect {}", kb_id, backend.type_name()))?;

        info!(
            retriever = %decl.name,
            knowledge_base = %kb_id,
            backend = backend.type_name(),
            collection = %index_namespace,
            embedder = embedder.model(),
            "resolved knowledge base retriever"
        );

        let binding = KnowledgeBaseBinding {
            knowledge_base: kb_id,
            embedder: embedder_ref,
            vector_store: vs_ref,
            index_namespace,
            num_documents,
            score_threshold,
        };
        Ok(Retriever::new(
            binding,
            VectorStoreClient::new(embedder, index),
            decl.doc_null_return,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    namespace: String,
    name: String,
    generation: i64,
}

/// Resolve-once cache of retrievers keyed by node identity and generation
pub struct RetrieverCache {
    resolver: Arc<RetrieverResolver>,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<Retriever>>>>,
}

impl RetrieverCache {
    pub fn new(resolver: Arc<RetrieverResolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached retriever for `node` at `generation`, resolving at most once
    /// per key even under concurrent callers. Failures are not cached. A
    /// request for a generation older than one already cached is served
    /// from the newest entry.
    pub async fn get_or_resolve(
        &self,
        ctx: &CallContext,
        node: &TypedObjectReference,
        generation: i64,
    ) -> Result<Retriever> {
        let namespace = node.namespace_or(self.resolver.app_namespace()).to_string();

        let cell = {
            let mut entries = self.entries.lock().await;
            let newest = entries
                .keys()
                .filter(|k| k.namespace == namespace && k.name == node.name)
                .map(|k| k.generation)
                .max();
            let generation = newest.map_or(generation, |g| g.max(generation));
            let key = CacheKey {
                namespace,
                name: node.name.clone(),
                generation,
            };

            // older generations of the same node are stale
            entries.retain(|k, _| {
                k.namespace != key.namespace || k.name != key.name || k.generation >= generation
            });
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_try_init(|| self.resolver.resolve(ctx, node))
            .await
            .cloned()
    }

    /// Drop every cached generation of `node`
    pub async fn invalidate(&self, node: &TypedObjectReference) {
        let namespace = node.namespace_or(self.resolver.app_namespace()).to_string();
        let mut entries = self.entries.lock().await;
        entries.retain(|k, _| k.namespace != namespace || k.name != node.name);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
