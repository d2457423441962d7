// Read contract over declared knowledge-base resources
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::errors::{Result, RetrievalError};
use crate::knowledge::types::{EmbedderDecl, KnowledgeBaseDecl, RetrieverDecl, VectorIndexDecl};

/// Source of knowledge-base declarations
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get_knowledge_base(&self, namespace: &str, name: &str) -> Result<KnowledgeBaseDecl>;
    async fn get_embedder(&self, namespace: &str, name: &str) -> Result<EmbedderDecl>;
    async fn get_vector_index(&self, namespace: &str, name: &str) -> Result<VectorIndexDecl>;
    async fn get_retriever(&self, namespace: &str, name: &str) -> Result<RetrieverDecl>;
}

/// On-disk manifest layout, one array of tables per kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub knowledge_base: Vec<KnowledgeBaseDecl>,
    #[serde(default)]
    pub embedder: Vec<EmbedderDecl>,
    #[serde(default)]
    pub vector_index: Vec<VectorIndexDecl>,
    #[serde(default)]
    pub retriever: Vec<RetrieverDecl>,
}

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn lookup<T: Clone>(
    map: &HashMap<Key, T>,
    kind: &'static str,
    namespace: &str,
    name: &str,
) -> Result<T> {
    map.get(&key(namespace, name))
        .cloned()
        .ok_or_else(|| RetrievalError::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
}

/// Config store backed by a fixed set of declarations
#[derive(Debug, Clone, Default)]
pub struct StaticConfigStore {
    knowledge_bases: HashMap<Key, KnowledgeBaseDecl>,
    embedders: HashMap<Key, EmbedderDecl>,
    vector_indexes: HashMap<Key, VectorIndexDecl>,
    retrievers: HashMap<Key, RetrieverDecl>,
}

impl StaticConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load declarations from a TOML manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RetrievalError::Io(e).context(format!("read manifest {}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(contents)?;
        Ok(Self::from_manifest(manifest))
    }

    pub fn from_manifest(manifest: Manifest) -> Self {
        let mut store = Self::new();
        for kb in manifest.knowledge_base {
            store.insert_knowledge_base(kb);
        }
        for embedder in manifest.embedder {
            store.insert_embedder(embedder);
        }
        for index in manifest.vector_index {
            store.insert_vector_index(index);
        }
        for retriever in manifest.retriever {
            store.insert_retriever(retriever);
        }
        store
    }

    pub fn insert_knowledge_base(&mut self, decl: KnowledgeBaseDecl) {
        self.knowledge_bases
            .insert(key(&decl.namespace, &decl.name), decl);
    }

    pub fn insert_embedder(&mut self, decl: EmbedderDecl) {
        self.embedders.insert(key(&decl.namespace, &decl.name), decl);
    }

    pub fn insert_vector_index(&mut self, decl: VectorIndexDecl) {
        self.vector_indexes
            .insert(key(&decl.namespace, &decl.name), decl);
    }

    pub fn insert_retriever(&mut self, decl: RetrieverDecl) {
        self.retrievers.insert(key(&decl.namespace, &decl.name), decl);
    }
}

#[async_trait]
impl ConfigStore for StaticConfigStore {
    async fn get_knowledge_base(&self, namespace: &str, name: &str) -> Result<KnowledgeBaseDecl> {
        lookup(&self.knowledge_bases, "knowledgebase", namespace, name)
    }

    async fn get_embedder(&self, namespace: &str, name: &str) -> Result<EmbedderDecl> {
        lookup(&self.embedders, "embedder", namespace, name)
    }

    async fn get_vector_index(&self, namespace: &str, name: &str) -> Result<VectorIndexDecl> {
        lookup(&self.vector_indexes, "vectorstore", namespace, name)
    }

    async fn get_retriever(&self, namespace: &str, name: &str) -> Result<RetrieverDecl> {
        lookup(&self.retrievers, "knowledgebaseretriever", namespace, name)
    }
}
