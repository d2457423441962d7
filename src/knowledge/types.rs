// Declarations read from the config store: knowledge bases, embedders,
// vector indexes and retriever nodes.
use serde::{Deserialize, Serialize};

/// Reference to another declared object, optionally in another namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
    #[serde(default)]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl TypedObjectReference {
    pub fn new(kind: &str, name: &str) -> Self {
        Self {
            api_group: None,
            kind: kind.to_string(),
            name: name.to_string(),
            namespace: None,
        }
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    /// Namespace of the referenced object, falling back to the owner's
    pub fn namespace_or<'a>(&'a self, owner: &'a str) -> &'a str {
        self.namespace.as_deref().unwrap_or(owner)
    }
}

/// A knowledge base: which embedder fills which vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseDecl {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub generation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedder: Option<TypedObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store: Option<TypedObjectReference>,
}

impl KnowledgeBaseDecl {
    /// Collection name in the vector index; stable for a given knowledge base
    pub fn vector_store_collection_name(&self) -> String {
        format!("{}_{}", self.namespace, self.name)
    }
}

/// Embedding service declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderDecl {
    pub namespace: String,
    pub name: String,
    /// Provider type, e.g. `ollama` or `openai`
    #[serde(rename = "type")]
    pub provider: String,
    pub endpoint: Endpoint,
    pub model: String,
    /// Environment variable holding the API key, if the provider needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
}

/// Vector index declaration. Exactly one backend section is expected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexDecl {
    pub namespace: String,
    pub name: String,
    pub endpoint: Endpoint,
    /// Backend type name when neither known section is set
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chroma: Option<ChromaSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qdrant: Option<QdrantSpec>,
}

impl VectorIndexDecl {
    /// Backend type name used for dispatch and diagnostics
    pub fn backend_type(&self) -> &str {
        if self.chroma.is_some() {
            "chroma"
        } else if self.qdrant.is_some() {
            "qdrant"
        } else {
            self.declared_type.as_deref().unwrap_or("unknown")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChromaSpec {
    pub distance_function: DistanceFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QdrantSpec {
    /// Payload key holding the document text
    #[serde(default = "default_content_key")]
    pub content_key: String,
}

fn default_content_key() -> String {
    "document".to_string()
}

/// Distance function of a Chroma collection (`hnsw:space`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceFunction {
    Cosine,
    L2,
    Ip,
}

impl DistanceFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
            Self::Ip => "ip",
        }
    }
}

/// Retriever node declaration in an application graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieverDecl {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub generation: i64,
    pub knowledge_base: TypedObjectReference,
    pub num_documents: Option<usize>,
    pub score_threshold: Option<f32>,
    #[serde(default)]
    pub doc_null_return: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_is_stable() {
        let kb = KnowledgeBaseDecl {
            namespace: "arcadia".to_string(),
            name: "hr-docs".to_string(),
            generation: 3,
            display_name: None,
            embedder: None,
            vector_store: None,
        };
        assert_eq!(kb.vector_store_collection_name(), "arcadia_hr-docs");
        assert_eq!(kb.vector_store_collection_name(), kb.clone().vector_store_collection_name());
    }

    #[test]
    fn test_reference_namespace_fallback() {
        let r = TypedObjectReference::new("Embedder", "bge");
        assert_eq!(r.namespace_or("arcadia"), "arcadia");

        let r = r.in_namespace("shared");
        assert_eq!(r.namespace_or("arcadia"), "shared");
    }

    #[test]
    fn test_backend_type() {
        let mut decl = VectorIndexDecl {
            namespace: "arcadia".to_string(),
            name: "vs".to_string(),
            endpoint: Endpoint {
                url: "http://chroma:8000".to_string(),
            },
            declared_type: Some("pgvector".to_string()),
            chroma: None,
            qdrant: None,
        };
        assert_eq!(decl.backend_type(), "pgvector");

        decl.chroma = Some(ChromaSpec {
            distance_function: DistanceFunction::Cosine,
        });
        assert_eq!(decl.backend_type(), "chroma");
    }

    #[test]
    fn test_distance_function_serde() {
        let chroma: ChromaSpec = toml::from_str("distance_function = \"l2\"").unwrap();
        assert_eq!(chroma.distance_function, DistanceFunction::L2);
        assert_eq!(chroma.distance_function.as_str(), "l2");
    }
}
